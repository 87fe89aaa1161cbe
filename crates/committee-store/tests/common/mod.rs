use chrono::Utc;
use committee_core::model::{Committee, CommitteeMember, CommitteeSettings};
use committee_store::KvCommitteeRepository;

/// Fresh repository over in-memory buckets
#[allow(dead_code)]
pub fn new_repo() -> KvCommitteeRepository {
    KvCommitteeRepository::in_memory()
}

/// Committee with UID and timestamps stamped, ready to persist
#[allow(dead_code)]
pub fn committee(uid: &str, project_uid: &str, name: &str) -> Committee {
    let mut c = Committee::draft(project_uid, name);
    c.uid = uid.to_string();
    c.category = "Technical Steering Committee".to_string();
    c.created_at = Utc::now();
    c.updated_at = c.created_at;
    c
}

#[allow(dead_code)]
pub fn settings(uid: &str) -> CommitteeSettings {
    let now = Utc::now();
    CommitteeSettings {
        uid: uid.to_string(),
        writers: vec!["writer".to_string()],
        auditors: vec!["auditor".to_string()],
        created_at: now,
        updated_at: now,
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn member(uid: &str, committee_uid: &str, email: &str) -> CommitteeMember {
    let mut m = CommitteeMember::draft(committee_uid, email);
    m.uid = uid.to_string();
    m.created_at = Utc::now();
    m.updated_at = m.created_at;
    m
}
