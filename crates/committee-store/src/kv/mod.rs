//! Revision-gated key-value contract
//!
//! The only primitive the repository uses to touch persisted state. It knows
//! nothing about committees.

use async_trait::async_trait;

use crate::errors::Result;

pub mod memory;

pub use memory::MemoryKv;

/// Expected revision meaning "create only, must not exist"
pub const CREATE_ONLY: u64 = 0;

/// A stored value with the revision that last wrote it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: Vec<u8>,
    pub revision: u64,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    ///
    /// `KeyNotFound` when the key is absent.
    async fn get(&self, key: &str) -> Result<Entry>;

    /// Write `value`, returning the new revision
    ///
    /// # Errors
    ///
    /// * `KeyExists` - create-only write of a present key
    /// * `KeyNotFound` - gated write of an absent key
    /// * `KeyRevisionMismatch` - the key moved past `expected_revision`
    async fn put(&self, key: &str, value: Vec<u8>, expected_revision: u64) -> Result<u64>;

    /// # Errors
    ///
    /// `KeyNotFound` when absent, `KeyRevisionMismatch` on a stale revision.
    async fn delete(&self, key: &str, expected_revision: u64) -> Result<()>;

    /// Live keys starting with `prefix`, sorted
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}
