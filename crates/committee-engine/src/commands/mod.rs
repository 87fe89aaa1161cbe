//! Command and query handlers for committees and their members

pub mod attributes;
pub mod committee_writer;
pub mod member_writer;
pub mod message_handler;
pub mod orchestrator;
pub mod reader;
pub mod reservations;

pub use attributes::CommitteeAttribute;
pub use message_handler::{
    AttributeRequest, InboundMessage, MessageHandler, Reply, SUBJECT_GET_ATTRIBUTE,
    SUBJECT_GET_NAME,
};
pub use orchestrator::WriteOrchestrator;
pub use reader::ReadOrchestrator;
pub use reservations::{Compensation, RollbackGuard};
