//! Serves the inbound request subjects over NATS request/reply
//!
//! Each request runs on its own task. Successful replies carry the raw bytes
//! from the handler; failures carry a small JSON document.

use bytes::Bytes;
use committee_core::committee_core_types::RequestContext;
use committee_core::errors::{CommitteeError, ExError, Result};
use committee_engine::{InboundMessage, MessageHandler};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Queue group shared by every service instance, so each request is answered once
pub const QUEUE_GROUP: &str = "committee-service";

/// Body of a failed reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub code: String,
    pub status: u16,
    pub message: String,
}

impl From<&ExError> for ErrorReply {
    fn from(err: &ExError) -> Self {
        Self {
            code: err.code().to_string(),
            status: err.status_class(),
            message: err.message().to_string(),
        }
    }
}

pub fn encode_error(err: &ExError) -> Vec<u8> {
    serde_json::to_vec(&ErrorReply::from(err)).unwrap_or_else(|_| err.to_string().into_bytes())
}

#[derive(Clone)]
pub struct Responder {
    client: async_nats::Client,
    handler: MessageHandler,
}

impl Responder {
    pub fn new(client: async_nats::Client, handler: MessageHandler) -> Self {
        Self { client, handler }
    }

    /// Answer requests until `shutdown` fires, then drain in-flight replies
    ///
    /// # Errors
    ///
    /// `Storage` when a subscription cannot be set up.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let mut subscriptions = Vec::new();
        for subject in MessageHandler::subjects() {
            let subscriber = self
                .client
                .queue_subscribe(subject.to_string(), QUEUE_GROUP.to_string())
                .await
                .map_err(|e| CommitteeError::Storage {
                    message: format!("subscribe {}: {}", subject, e),
                })?;
            subscriptions.push(subscriber);
        }
        tracing::info!(queue_group = QUEUE_GROUP, "responder listening");

        let mut incoming = futures::stream::select_all(subscriptions);
        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = incoming.next() => match next {
                    Some(message) => {
                        let this = self.clone();
                        in_flight.spawn(async move { this.answer(message).await });
                    }
                    None => break,
                },
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }

        while in_flight.join_next().await.is_some() {}
        tracing::info!("responder stopped");
        Ok(())
    }

    async fn answer(&self, message: async_nats::Message) {
        let Some(reply_to) = message.reply.clone() else {
            tracing::debug!(subject = %message.subject, "request without reply subject dropped");
            return;
        };

        let ctx = RequestContext::new();
        let (inbound, reply) =
            InboundMessage::new(message.subject.to_string(), message.payload.to_vec());
        self.handler.handle(&ctx, inbound).await;

        let body = match reply.await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(err)) => encode_error(&err),
            Err(_) => return,
        };
        if let Err(e) = self.client.publish(reply_to, Bytes::from(body)).await {
            tracing::warn!(
                subject = %message.subject,
                request_id = ctx.request_id.as_str(),
                error = %e,
                "reply not delivered"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use committee_core::errors::ExErrorKind;

    #[test]
    fn test_error_reply_carries_code_and_status() {
        let err = ExError::from(CommitteeError::CommitteeNotFound { uid: "c1".into() })
            .with_op("committee.get_name");
        let reply: ErrorReply = serde_json::from_slice(&encode_error(&err)).unwrap();
        assert_eq!(reply.code, "ERR_NOT_FOUND");
        assert_eq!(reply.status, 404);
        assert_eq!(reply.message, "committee not found: c1");
    }

    #[test]
    fn test_validation_reply() {
        let err = ExError::new(ExErrorKind::Validation).with_message("committee uid is required");
        let reply: ErrorReply = serde_json::from_slice(&encode_error(&err)).unwrap();
        assert_eq!(reply.status, 400);
    }
}
