//! Repository layer over the revision-gated key-value contract

pub mod kv_repo;
pub mod project_reader;

pub use kv_repo::KvCommitteeRepository;
pub use project_reader::{KvProjectReader, ProjectRecord};
