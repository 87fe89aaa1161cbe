//! JetStream key-value driver for the revision-gated contract
//!
//! JetStream reports conditional-write failures through several error kinds
//! that differ between server versions. Instead of matching on them, a failed
//! write re-reads the key and classifies the failure from what is there now.
//!
//! Contract keys separate segments with `/`; here every `/` becomes the
//! subject separator `.`, so a prefix scan is a subject filter evaluated by
//! the server.

use std::time::Duration;

use async_nats::jetstream::consumer::{pull, AckPolicy, DeliverPolicy};
use async_nats::jetstream::kv::{Operation, Store};
use async_trait::async_trait;
use bytes::Bytes;
use committee_core::errors::{CommitteeError, Result};
use committee_store::{Entry, KeyValueStore, CREATE_ONLY};
use futures::StreamExt;

const KV_OPERATION_HEADER: &str = "KV-Operation";
const SCAN_INACTIVE_THRESHOLD: Duration = Duration::from_secs(30);

/// A JetStream key-value bucket
#[derive(Clone)]
pub struct NatsKv {
    bucket: String,
    store: Store,
}

impl NatsKv {
    pub fn new(bucket: impl Into<String>, store: Store) -> Self {
        Self {
            bucket: bucket.into(),
            store,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Live entry of `key`; tombstones read as absent
    async fn live_entry(&self, key: &str) -> Result<Option<Entry>> {
        let entry = self
            .store
            .entry(subject_key(key)?)
            .await
            .map_err(|e| storage(&self.bucket, "read", key, e))?;
        Ok(entry.and_then(|e| match e.operation {
            Operation::Put => Some(Entry {
                value: e.value.to_vec(),
                revision: e.revision,
            }),
            Operation::Delete | Operation::Purge => None,
        }))
    }

    /// Live revision of `key`, if any
    async fn live_revision(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.live_entry(key).await?.map(|e| e.revision))
    }
}

#[async_trait]
impl KeyValueStore for NatsKv {
    async fn get(&self, key: &str) -> Result<Entry> {
        self.live_entry(key)
            .await?
            .ok_or_else(|| CommitteeError::KeyNotFound {
                key: key.to_string(),
            })
    }

    async fn put(&self, key: &str, value: Vec<u8>, expected_revision: u64) -> Result<u64> {
        let value = Bytes::from(value);
        if expected_revision == CREATE_ONLY {
            return match self.store.create(subject_key(key)?, value).await {
                Ok(revision) => Ok(revision),
                Err(e) => {
                    let current = self.live_revision(key).await?;
                    Err(classify(
                        WriteKind::Create,
                        key,
                        expected_revision,
                        current,
                        storage(&self.bucket, "create", key, e),
                    ))
                }
            };
        }

        match self
            .store
            .update(subject_key(key)?, value, expected_revision)
            .await
        {
            Ok(revision) => Ok(revision),
            Err(e) => {
                let current = self.live_revision(key).await?;
                Err(classify(
                    WriteKind::Gated,
                    key,
                    expected_revision,
                    current,
                    storage(&self.bucket, "update", key, e),
                ))
            }
        }
    }

    async fn delete(&self, key: &str, expected_revision: u64) -> Result<()> {
        // JetStream accepts a gated delete of a tombstoned key; the contract does not.
        if self.live_revision(key).await?.is_none() {
            return Err(CommitteeError::KeyNotFound {
                key: key.to_string(),
            });
        }
        match self
            .store
            .delete_expect_revision(subject_key(key)?, Some(expected_revision))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                let current = self.live_revision(key).await?;
                Err(classify(
                    WriteKind::Gated,
                    key,
                    expected_revision,
                    current,
                    storage(&self.bucket, "delete", key, e),
                ))
            }
        }
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let filter = format!("{}{}", self.store.prefix, scan_filter(prefix)?);
        let scan_error = |e: &dyn std::fmt::Display| storage(&self.bucket, "list", prefix, e);

        // Ephemeral ordered scan: one headers-only message per live subject
        let mut consumer = self
            .store
            .stream
            .create_consumer(pull::Config {
                filter_subject: filter,
                deliver_policy: DeliverPolicy::LastPerSubject,
                ack_policy: AckPolicy::None,
                headers_only: true,
                inactive_threshold: SCAN_INACTIVE_THRESHOLD,
                ..Default::default()
            })
            .await
            .map_err(|e| scan_error(&e))?;
        let pending = consumer.info().await.map_err(|e| scan_error(&e))?.num_pending;

        let mut keys = Vec::new();
        if pending > 0 {
            let mut messages = consumer.messages().await.map_err(|e| scan_error(&e))?;
            while let Some(message) = messages.next().await {
                let message = message.map_err(|e| scan_error(&e))?;
                let tombstone = message
                    .headers
                    .as_ref()
                    .and_then(|h| h.get(KV_OPERATION_HEADER))
                    .is_some_and(|op| matches!(op.as_str(), "DEL" | "PURGE"));
                let subject = message.subject.as_str();
                if let Some(key) = subject.strip_prefix(self.store.prefix.as_str()) {
                    let key = contract_key(key);
                    if !tombstone && key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
                let remaining = message
                    .info()
                    .map(|i| i.pending)
                    .map_err(|e| scan_error(&e))?;
                if remaining == 0 {
                    break;
                }
            }
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

/// JetStream form of a contract key
fn subject_key(key: &str) -> Result<String> {
    if key.is_empty() || key.contains('.') || key.split('/').any(str::is_empty) {
        return Err(CommitteeError::InvalidInput {
            reason: format!(
                "key '{}' must be non-empty '/'-separated segments without '.'",
                key
            ),
        });
    }
    Ok(key.replace('/', "."))
}

fn contract_key(subject_key: &str) -> String {
    subject_key.replace('.', "/")
}

/// Subject filter covering every key that starts with `prefix`
///
/// Only whole segments can be filtered by the server; a partial last segment
/// widens the filter to its parent and is matched again on the client.
fn scan_filter(prefix: &str) -> Result<String> {
    let whole = match prefix.rfind('/') {
        Some(end) => &prefix[..=end],
        None => "",
    };
    if whole.is_empty() {
        return Ok(">".to_string());
    }
    Ok(format!("{}.>", subject_key(whole.trim_end_matches('/'))?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteKind {
    Create,
    Gated,
}

/// Map a failed conditional write onto the contract's errors
///
/// `current` is the key's live revision read after the failure. When it
/// explains nothing (the write should have succeeded) the transport error is
/// returned unchanged.
pub(crate) fn classify(
    kind: WriteKind,
    key: &str,
    expected: u64,
    current: Option<u64>,
    transport: CommitteeError,
) -> CommitteeError {
    match (kind, current) {
        (WriteKind::Create, Some(_)) => CommitteeError::KeyExists {
            key: key.to_string(),
        },
        (WriteKind::Create, None) => transport,
        (WriteKind::Gated, None) => CommitteeError::KeyNotFound {
            key: key.to_string(),
        },
        (WriteKind::Gated, Some(revision)) if revision != expected => {
            CommitteeError::KeyRevisionMismatch {
                key: key.to_string(),
                expected,
            }
        }
        (WriteKind::Gated, Some(_)) => transport,
    }
}

fn storage(bucket: &str, action: &str, key: &str, err: impl std::fmt::Display) -> CommitteeError {
    CommitteeError::Storage {
        message: format!("{} {}/{}: {}", action, bucket, key, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> CommitteeError {
        CommitteeError::Storage {
            message: "timed out".to_string(),
        }
    }

    #[test]
    fn test_keys_map_onto_subject_tokens() {
        assert_eq!(
            subject_key("lookup/committee-members/c1/ab12").unwrap(),
            "lookup.committee-members.c1.ab12"
        );
        assert_eq!(contract_key("lookup.committees.p1.tsc"), "lookup/committees/p1/tsc");
        assert!(subject_key("a.b").is_err());
        assert!(subject_key("a//b").is_err());
        assert!(subject_key("").is_err());
    }

    #[test]
    fn test_scan_filter_narrows_to_whole_segments() {
        assert_eq!(
            scan_filter("lookup/committee-members/c1/").unwrap(),
            "lookup.committee-members.c1.>"
        );
        assert_eq!(scan_filter("lookup/comm").unwrap(), "lookup.>");
        assert_eq!(scan_filter("").unwrap(), ">");
        assert_eq!(scan_filter("c1").unwrap(), ">");
    }

    #[test]
    fn test_create_over_live_key_is_key_exists() {
        let err = classify(WriteKind::Create, "k", CREATE_ONLY, Some(7), transport());
        assert_eq!(err, CommitteeError::KeyExists { key: "k".into() });
    }

    #[test]
    fn test_create_failure_without_key_keeps_transport_error() {
        let err = classify(WriteKind::Create, "k", CREATE_ONLY, None, transport());
        assert_eq!(err, transport());
    }

    #[test]
    fn test_gated_write_of_missing_key() {
        let err = classify(WriteKind::Gated, "k", 3, None, transport());
        assert_eq!(err, CommitteeError::KeyNotFound { key: "k".into() });
    }

    #[test]
    fn test_gated_write_with_moved_revision() {
        let err = classify(WriteKind::Gated, "k", 3, Some(9), transport());
        assert_eq!(
            err,
            CommitteeError::KeyRevisionMismatch {
                key: "k".into(),
                expected: 3
            }
        );
    }

    #[test]
    fn test_gated_write_at_expected_revision_is_transport() {
        let err = classify(WriteKind::Gated, "k", 3, Some(3), transport());
        assert_eq!(err, transport());
    }
}
