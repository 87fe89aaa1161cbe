//! Inbound request/response messages answered from the read path
//!
//! A request carries an opaque payload and a one-shot response channel. On
//! success the handler replies with raw bytes; on failure it replies with the
//! canonical `ExError` and leaves serialization to the transport.

use std::sync::Arc;

use committee_core::committee_core_types::RequestContext;
use committee_core::errors::{CommitteeError, ExError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::reader::ReadOrchestrator;

pub const SUBJECT_GET_NAME: &str = "committee.get_name";
pub const SUBJECT_GET_ATTRIBUTE: &str = "committee.get_attribute";

pub type Reply = std::result::Result<Vec<u8>, ExError>;

#[derive(Debug)]
pub struct InboundMessage {
    pub subject: String,
    pub payload: Vec<u8>,
    pub reply: oneshot::Sender<Reply>,
}

impl InboundMessage {
    /// Build a request and the receiver its reply arrives on
    pub fn new(
        subject: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> (Self, oneshot::Receiver<Reply>) {
        let (reply, rx) = oneshot::channel();
        (
            Self {
                subject: subject.into(),
                payload: payload.into(),
                reply,
            },
            rx,
        )
    }
}

/// Payload of `committee.get_attribute`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRequest {
    pub uid: String,
    pub attribute: String,
}

#[derive(Clone)]
pub struct MessageHandler {
    reads: Arc<ReadOrchestrator>,
}

impl MessageHandler {
    pub fn new(reads: Arc<ReadOrchestrator>) -> Self {
        Self { reads }
    }

    pub fn subjects() -> [&'static str; 2] {
        [SUBJECT_GET_NAME, SUBJECT_GET_ATTRIBUTE]
    }

    /// Answer one request; the reply is always sent
    pub async fn handle(&self, ctx: &RequestContext, message: InboundMessage) {
        let InboundMessage {
            subject,
            payload,
            reply,
        } = message;

        let outcome = self.dispatch(ctx, &subject, &payload).await.map_err(|e| {
            tracing::debug!(subject = %subject, error = %e, "request failed");
            ExError::from(e)
                .with_op(subject.clone())
                .with_request_id(ctx.request_id.clone())
        });

        if reply.send(outcome).is_err() {
            tracing::debug!(subject = %subject, "requester went away before the reply");
        }
    }

    async fn dispatch(&self, ctx: &RequestContext, subject: &str, payload: &[u8]) -> Result<Vec<u8>> {
        match subject {
            SUBJECT_GET_NAME => {
                let uid = payload_uid(payload)?;
                let (committee, _) = self.reads.get_committee(ctx, &uid).await?;
                Ok(committee.name.into_bytes())
            }
            SUBJECT_GET_ATTRIBUTE => {
                let request: AttributeRequest =
                    serde_json::from_slice(payload).map_err(|e| CommitteeError::InvalidInput {
                        reason: format!("malformed attribute request: {}", e),
                    })?;
                let value = self
                    .reads
                    .get_attribute(ctx, request.uid.trim(), &request.attribute)
                    .await?;
                Ok(value.into_bytes())
            }
            other => Err(CommitteeError::InvalidInput {
                reason: format!("unsupported subject: {}", other),
            }),
        }
    }
}

fn payload_uid(payload: &[u8]) -> Result<String> {
    let uid = std::str::from_utf8(payload)
        .map_err(|_| CommitteeError::InvalidInput {
            reason: "committee uid is not valid UTF-8".to_string(),
        })?
        .trim();
    if uid.is_empty() {
        return Err(CommitteeError::InvalidInput {
            reason: "committee uid is required".to_string(),
        });
    }
    Ok(uid.to_string())
}
