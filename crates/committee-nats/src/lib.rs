//! Committee NATS - production adapters
//!
//! Provides:
//! - `NatsKv`, the JetStream key-value driver behind `KeyValueStore`
//! - `NatsPublisher`, core NATS delivery for indexer and access messages
//! - `Responder`, serving the inbound request subjects
//! - `NatsBackend`, wiring all of the above from `NatsConfig`

pub mod backend;
pub mod kv;
pub mod publisher;
pub mod responder;

pub use backend::NatsBackend;
pub use kv::NatsKv;
pub use publisher::NatsPublisher;
pub use responder::{encode_error, ErrorReply, Responder, QUEUE_GROUP};
