//! Committee Store - persistence over a revision-gated key-value store
//!
//! Provides:
//! - The `KeyValueStore` contract with an in-memory backend
//! - `KvCommitteeRepository`, implementing the reader/writer ports and the
//!   reservation-key primitives
//! - `KvProjectReader`, resolving project slugs and names

pub mod errors;
pub mod kv;
pub mod repo;

pub use errors::Result;
pub use kv::{Entry, KeyValueStore, MemoryKv, CREATE_ONLY};
pub use repo::{KvCommitteeRepository, KvProjectReader, ProjectRecord};
