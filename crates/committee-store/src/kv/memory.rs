//! In-memory key-value backend
//!
//! Thread-safe via `RwLock`. Revisions come from one store-wide sequence, so
//! a key that is deleted and re-created never reuses an older revision.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use committee_core::errors::CommitteeError;

use super::{Entry, KeyValueStore, CREATE_ONLY};
use crate::errors::{lock_poisoned, Result};

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, Entry>,
    sequence: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Entry> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        inner
            .entries
            .get(key)
            .cloned()
            .ok_or_else(|| CommitteeError::KeyNotFound {
                key: key.to_string(),
            })
    }

    async fn put(&self, key: &str, value: Vec<u8>, expected_revision: u64) -> Result<u64> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;

        match (inner.entries.get(key), expected_revision) {
            (Some(_), CREATE_ONLY) => {
                return Err(CommitteeError::KeyExists {
                    key: key.to_string(),
                })
            }
            (None, CREATE_ONLY) => {}
            (None, _) => {
                return Err(CommitteeError::KeyNotFound {
                    key: key.to_string(),
                })
            }
            (Some(current), expected) if current.revision != expected => {
                return Err(CommitteeError::KeyRevisionMismatch {
                    key: key.to_string(),
                    expected,
                })
            }
            (Some(_), _) => {}
        }

        inner.sequence += 1;
        let revision = inner.sequence;
        inner
            .entries
            .insert(key.to_string(), Entry { value, revision });
        Ok(revision)
    }

    async fn delete(&self, key: &str, expected_revision: u64) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;

        match inner.entries.get(key) {
            None => Err(CommitteeError::KeyNotFound {
                key: key.to_string(),
            }),
            Some(current) if current.revision != expected_revision => {
                Err(CommitteeError::KeyRevisionMismatch {
                    key: key.to_string(),
                    expected: expected_revision,
                })
            }
            Some(_) => {
                inner.entries.remove(key);
                Ok(())
            }
        }
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
