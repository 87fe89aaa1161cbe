//! Downstream message builders
//!
//! Index messages feed the search indexer; access messages feed the
//! access-control relations. Subjects are opaque routing strings.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::model::{Committee, CommitteeMember, CommitteeSettings};

pub mod subjects {
    pub const INDEX_COMMITTEE: &str = "index.committee";
    pub const INDEX_COMMITTEE_SETTINGS: &str = "index.committee_settings";
    pub const INDEX_COMMITTEE_MEMBER: &str = "index.committee_member";
    pub const ACCESS_COMMITTEE_UPDATE: &str = "access.committee.update";
    pub const ACCESS_COMMITTEE_DELETE_ALL: &str = "access.committee.delete_all";
    pub const ACCESS_MEMBER_PUT: &str = "access.committee.member_put";
    pub const ACCESS_MEMBER_REMOVE: &str = "access.committee.member_remove";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageAction {
    Created,
    Updated,
    Deleted,
}

/// Envelope consumed by the indexer
///
/// `data` is the full record for created/updated and the bare UID for
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerMessage {
    pub action: MessageAction,
    pub data: serde_json::Value,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeAccessMessage {
    pub uid: String,
    pub public: bool,
    pub project_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_uid: Option<String>,
    #[serde(default)]
    pub writers: Vec<String>,
    #[serde(default)]
    pub auditors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAccessMessage {
    pub committee_uid: String,
    pub member_uid: String,
    #[serde(default)]
    pub username: String,
}

/// Which publisher method a message goes out through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Indexer,
    Access,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub channel: Channel,
    pub subject: &'static str,
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    fn indexer<T: Serialize>(subject: &'static str, message: &T) -> Result<Self> {
        Ok(Self {
            channel: Channel::Indexer,
            subject,
            payload: serde_json::to_vec(message)?,
        })
    }

    fn access<T: Serialize>(subject: &'static str, message: &T) -> Result<Self> {
        Ok(Self {
            channel: Channel::Access,
            subject,
            payload: serde_json::to_vec(message)?,
        })
    }
}

pub fn committee_tags(committee: &Committee) -> Vec<String> {
    let mut tags = vec![
        committee.uid.clone(),
        format!("committee_uid:{}", committee.uid),
        format!("project_uid:{}", committee.project_uid),
    ];
    if !committee.category.is_empty() {
        tags.push(format!("category:{}", committee.category));
    }
    if let Some(parent) = &committee.parent_uid {
        tags.push(format!("parent_uid:{}", parent));
    }
    if committee.holds_sso_group() {
        tags.push(format!("sso_group_name:{}", committee.sso_group_name));
    }
    tags
}

pub fn settings_tags(settings: &CommitteeSettings) -> Vec<String> {
    vec![
        settings.uid.clone(),
        format!("committee_uid:{}", settings.uid),
    ]
}

pub fn member_tags(member: &CommitteeMember) -> Vec<String> {
    let mut tags = vec![
        member.uid.clone(),
        format!("member_uid:{}", member.uid),
        format!("committee_uid:{}", member.committee_uid),
    ];
    if !member.username.is_empty() {
        tags.push(format!("username:{}", member.username));
    }
    tags
}

/// # Errors
///
/// `Serialization` if the record cannot be encoded.
pub fn index_committee(action: MessageAction, committee: &Committee) -> Result<OutboundMessage> {
    OutboundMessage::indexer(
        subjects::INDEX_COMMITTEE,
        &IndexerMessage {
            action,
            data: serde_json::to_value(committee)?,
            tags: committee_tags(committee),
        },
    )
}

/// # Errors
///
/// `Serialization` if the record cannot be encoded.
pub fn index_settings(
    action: MessageAction,
    settings: &CommitteeSettings,
) -> Result<OutboundMessage> {
    OutboundMessage::indexer(
        subjects::INDEX_COMMITTEE_SETTINGS,
        &IndexerMessage {
            action,
            data: serde_json::to_value(settings)?,
            tags: settings_tags(settings),
        },
    )
}

/// # Errors
///
/// `Serialization` if the record cannot be encoded.
pub fn index_member(action: MessageAction, member: &CommitteeMember) -> Result<OutboundMessage> {
    OutboundMessage::indexer(
        subjects::INDEX_COMMITTEE_MEMBER,
        &IndexerMessage {
            action,
            data: serde_json::to_value(member)?,
            tags: member_tags(member),
        },
    )
}

/// Deletion notice carrying only the UID
///
/// # Errors
///
/// `Serialization` if the envelope cannot be encoded.
pub fn index_deleted(subject: &'static str, uid: &str) -> Result<OutboundMessage> {
    OutboundMessage::indexer(
        subject,
        &IndexerMessage {
            action: MessageAction::Deleted,
            data: serde_json::Value::String(uid.to_string()),
            tags: vec![uid.to_string()],
        },
    )
}

/// Access relations for a committee; missing settings mean no writers or
/// auditors
///
/// # Errors
///
/// `Serialization` if the message cannot be encoded.
pub fn access_committee(
    committee: &Committee,
    settings: Option<&CommitteeSettings>,
) -> Result<OutboundMessage> {
    let (writers, auditors) = settings
        .map(|s| (s.writers.clone(), s.auditors.clone()))
        .unwrap_or_default();
    OutboundMessage::access(
        subjects::ACCESS_COMMITTEE_UPDATE,
        &CommitteeAccessMessage {
            uid: committee.uid.clone(),
            public: committee.public,
            project_uid: committee.project_uid.clone(),
            parent_uid: committee.parent_uid.clone(),
            writers,
            auditors,
        },
    )
}

/// # Errors
///
/// Never fails in practice; kept fallible like its siblings.
pub fn access_delete_all(uid: &str) -> Result<OutboundMessage> {
    Ok(OutboundMessage {
        channel: Channel::Access,
        subject: subjects::ACCESS_COMMITTEE_DELETE_ALL,
        payload: uid.as_bytes().to_vec(),
    })
}

/// # Errors
///
/// `Serialization` if the message cannot be encoded.
pub fn access_member(subject: &'static str, member: &CommitteeMember) -> Result<OutboundMessage> {
    OutboundMessage::access(
        subject,
        &MemberAccessMessage {
            committee_uid: member.committee_uid.clone(),
            member_uid: member.uid.clone(),
            username: member.username.clone(),
        },
    )
}
