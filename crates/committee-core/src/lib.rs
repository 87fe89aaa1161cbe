//! Committee Core - domain kernel of the committee write path
//!
//! This crate provides:
//! - The committee, settings and member models with their validation rules
//! - Reservation-key derivation for the uniqueness index
//! - Port traits implemented by storage and transport adapters
//! - Downstream message builders and the bounded publish executor
//! - The error, logging and configuration facilities shared by every crate

pub mod config;
pub mod context;
pub mod errors;
pub mod executor;
pub mod keys;
pub mod logging_facility;
pub mod messages;
pub mod model;
pub mod ports;

// Re-exported so the logging macros resolve schema constants from any crate
pub use committee_core_types;

pub use config::{NatsConfig, OrchestratorConfig, ServiceConfig};
pub use context::cancellable;
pub use errors::{CommitteeError, ExError, ExErrorKind, Result};
pub use executor::BoundedExecutor;
pub use keys::{Reservable, ReservationKey, ReservationKind};
pub use model::{Committee, CommitteeMember, CommitteeSettings};
pub use ports::{CommitteePublisher, CommitteeReader, CommitteeWriter, ProjectReader};
