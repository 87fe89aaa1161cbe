//! Committee Engine - Orchestration layer
//!
//! Turns logical committee and member writes into ordered, revision-gated
//! store operations with reservation keys, compensation on failure and
//! downstream notifications. Also hosts the read path and the inbound
//! request handler.

pub mod commands;

pub use commands::{
    AttributeRequest, CommitteeAttribute, InboundMessage, MessageHandler, ReadOrchestrator, Reply,
    WriteOrchestrator, SUBJECT_GET_ATTRIBUTE, SUBJECT_GET_NAME,
};
