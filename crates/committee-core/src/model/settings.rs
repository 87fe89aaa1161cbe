use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Committee settings, mirrored by committee UID in their own collection
///
/// Writers and auditors feed the access-control relations of the committee.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitteeSettings {
    pub uid: String,
    #[serde(default)]
    pub business_email_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_by: Option<String>,
    #[serde(default)]
    pub writers: Vec<String>,
    #[serde(default)]
    pub auditors: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
