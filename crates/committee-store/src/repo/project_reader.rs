//! Project directory backed by a key-value bucket
//!
//! Projects belong to the wider platform; this crate only reads them.

use std::sync::Arc;

use async_trait::async_trait;
use committee_core::errors::{CommitteeError, Result};
use committee_core::ports::ProjectReader;
use serde::{Deserialize, Serialize};

use crate::errors::decode_error;
use crate::kv::KeyValueStore;

/// Project record as stored by the platform, keyed by UID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub uid: String,
    pub slug: String,
    pub name: String,
}

#[derive(Clone)]
pub struct KvProjectReader {
    projects: Arc<dyn KeyValueStore>,
}

impl KvProjectReader {
    pub fn new(projects: Arc<dyn KeyValueStore>) -> Self {
        Self { projects }
    }

    async fn record(&self, uid: &str) -> Result<ProjectRecord> {
        let entry = self.projects.get(uid).await.map_err(|e| match e {
            CommitteeError::KeyNotFound { .. } => CommitteeError::ProjectNotFound {
                uid: uid.to_string(),
            },
            other => other,
        })?;
        serde_json::from_slice(&entry.value).map_err(|e| decode_error(uid, e))
    }
}

#[async_trait]
impl ProjectReader for KvProjectReader {
    async fn slug(&self, uid: &str) -> Result<String> {
        Ok(self.record(uid).await?.slug)
    }

    async fn name(&self, uid: &str) -> Result<String> {
        Ok(self.record(uid).await?.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{MemoryKv, CREATE_ONLY};

    #[tokio::test]
    async fn test_resolves_slug_and_name() {
        let kv = Arc::new(MemoryKv::new());
        let record = ProjectRecord {
            uid: "p1".into(),
            slug: "p1".into(),
            name: "Project One".into(),
        };
        kv.put("p1", serde_json::to_vec(&record).unwrap(), CREATE_ONLY)
            .await
            .unwrap();

        let reader = KvProjectReader::new(kv);
        assert_eq!(reader.slug("p1").await.unwrap(), "p1");
        assert_eq!(reader.name("p1").await.unwrap(), "Project One");
    }

    #[tokio::test]
    async fn test_unknown_project_is_not_found() {
        let reader = KvProjectReader::new(Arc::new(MemoryKv::new()));
        let err = reader.slug("nope").await.unwrap_err();
        assert_eq!(err, CommitteeError::ProjectNotFound { uid: "nope".into() });
    }
}
