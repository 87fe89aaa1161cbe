//! Error helpers for committee-store
//!
//! The store speaks the core `CommitteeError` taxonomy; these helpers build
//! the store-specific variants.

use committee_core::errors::CommitteeError;

pub use committee_core::errors::Result;

pub fn lock_poisoned() -> CommitteeError {
    CommitteeError::Storage {
        message: "lock poisoned".to_string(),
    }
}

pub fn decode_error(key: &str, err: serde_json::Error) -> CommitteeError {
    CommitteeError::Serialization {
        message: format!("decoding {}: {}", key, err),
    }
}

/// Owner UID stored as a reservation value
pub fn owner_from_value(value: &[u8]) -> Option<String> {
    std::str::from_utf8(value)
        .ok()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
