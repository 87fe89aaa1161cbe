use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CommitteeError, Result};

/// Category whose members must carry an agency and a country
pub const GOVERNMENT_ADVISORY_COUNCIL: &str = "Government Advisory Council";

/// Calendar visibility of a committee
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub public: bool,
}

/// Committee - the base record stored under its UID
///
/// `(project_uid, name)` is unique across all committees and, when
/// `sso_group_enabled` is set, so is `sso_group_name`. Both claims are held
/// by reservation keys owned by the write orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Committee {
    /// Assigned at creation (UUID v4), immutable afterwards
    pub uid: String,
    pub project_uid: String,
    /// Resolved from the project directory on create/update
    #[serde(default)]
    pub project_name: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub enable_voting: bool,
    #[serde(default)]
    pub sso_group_enabled: bool,
    /// Generated by the orchestrator, never taken from the caller
    #[serde(default)]
    pub sso_group_name: String,
    #[serde(default)]
    pub requires_review: bool,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub calendar: Calendar,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_uid: Option<String>,
    #[serde(default)]
    pub total_members: u32,
    #[serde(default)]
    pub total_voting_repos: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Committee {
    /// Minimal committee draft for the given project and name
    pub fn draft(project_uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_uid: project_uid.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Check caller-supplied fields before anything is reserved
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the project or name is blank, or the committee
    /// names itself as its parent.
    pub fn validate(&self) -> Result<()> {
        if self.project_uid.trim().is_empty() {
            return Err(CommitteeError::InvalidInput {
                reason: "project_uid is required".to_string(),
            });
        }
        if self.name.trim().is_empty() {
            return Err(CommitteeError::InvalidInput {
                reason: "name cannot be empty or whitespace-only".to_string(),
            });
        }
        if let Some(parent) = &self.parent_uid {
            if parent.trim().is_empty() {
                return Err(CommitteeError::InvalidInput {
                    reason: "parent_uid cannot be blank".to_string(),
                });
            }
            if !self.uid.is_empty() && parent == &self.uid {
                return Err(CommitteeError::InvalidInput {
                    reason: "a committee cannot be its own parent".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn is_gac(&self) -> bool {
        self.category == GOVERNMENT_ADVISORY_COUNCIL
    }

    /// Whether this record currently holds an SSO group reservation
    pub fn holds_sso_group(&self) -> bool {
        self.sso_group_enabled && !self.sso_group_name.is_empty()
    }
}
