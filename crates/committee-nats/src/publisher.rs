//! Core NATS publisher for indexer and access-control messages

use async_trait::async_trait;
use bytes::Bytes;
use committee_core::errors::{CommitteeError, Result};
use committee_core::ports::CommitteePublisher;

/// Fire-and-forget publisher over a shared client connection
///
/// Both channels go through the same connection; the subject alone routes a
/// message to its consumer.
#[derive(Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }

    async fn send(&self, subject: &str, message: &[u8]) -> Result<()> {
        self.client
            .publish(subject.to_string(), Bytes::copy_from_slice(message))
            .await
            .map_err(|e| CommitteeError::Publish {
                subject: subject.to_string(),
                message: e.to_string(),
            })?;
        tracing::trace!(subject = %subject, bytes = message.len(), "published");
        Ok(())
    }
}

#[async_trait]
impl CommitteePublisher for NatsPublisher {
    async fn indexer(&self, subject: &str, message: &[u8]) -> Result<()> {
        self.send(subject, message).await
    }

    async fn access(&self, subject: &str, message: &[u8]) -> Result<()> {
        self.send(subject, message).await
    }
}
