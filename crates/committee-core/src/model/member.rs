use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::committee::Committee;
use crate::errors::{CommitteeError, Result};

/// Role held by a member inside the committee
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRole {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Voting status of a member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberVoting {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Organization the member represents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Committee member, unique per `(committee_uid, email)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitteeMember {
    pub uid: String,
    pub committee_uid: String,
    #[serde(default)]
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub role: MemberRole,
    #[serde(default)]
    pub appointed_by: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub voting: MemberVoting,
    #[serde(default)]
    pub agency: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub organization: Organization,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommitteeMember {
    /// Minimal member draft for the given committee
    pub fn draft(committee_uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            committee_uid: committee_uid.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Validate the member against the committee it belongs to
    ///
    /// # Errors
    ///
    /// * `InvalidInput` - e-mail missing or malformed
    /// * `MissingRequiredFields` - category-conditional fields are blank
    pub fn validate_for(&self, committee: &Committee) -> Result<()> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(CommitteeError::InvalidInput {
                reason: "email is required".to_string(),
            });
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => {
                return Err(CommitteeError::InvalidInput {
                    reason: "email is not a valid address".to_string(),
                })
            }
        }

        if committee.is_gac() {
            let mut missing = Vec::new();
            if self.agency.trim().is_empty() {
                missing.push("agency".to_string());
            }
            if self.country.trim().is_empty() {
                missing.push("country".to_string());
            }
            if !missing.is_empty() {
                return Err(CommitteeError::MissingRequiredFields {
                    category: committee.category.clone(),
                    fields: missing,
                });
            }
        }
        Ok(())
    }
}
