//! Connection wiring from configuration

use std::sync::Arc;

use async_nats::jetstream;
use committee_core::config::{NatsConfig, OrchestratorConfig, ServiceConfig};
use committee_core::errors::{CommitteeError, Result};
use committee_core::logging_facility;
use committee_engine::{MessageHandler, ReadOrchestrator, WriteOrchestrator};
use committee_store::{KvCommitteeRepository, KvProjectReader};

use crate::kv::NatsKv;
use crate::publisher::NatsPublisher;
use crate::responder::Responder;

/// Adapters bound to one NATS connection
#[derive(Clone)]
pub struct NatsBackend {
    client: async_nats::Client,
    repository: KvCommitteeRepository,
    projects: KvProjectReader,
    publisher: NatsPublisher,
}

impl NatsBackend {
    /// Process entry point: install logging for `log_profile`, then connect
    ///
    /// # Errors
    ///
    /// As `connect`.
    pub async fn start(config: &ServiceConfig) -> Result<Self> {
        logging_facility::init(config.log_profile);
        Self::connect(&config.nats).await
    }

    /// Connect and open the configured buckets
    ///
    /// Buckets are provisioned outside this service and must already exist.
    ///
    /// # Errors
    ///
    /// `Storage` when the server is unreachable or a bucket is missing.
    pub async fn connect(config: &NatsConfig) -> Result<Self> {
        let client = async_nats::connect(config.url.as_str())
            .await
            .map_err(|e| CommitteeError::Storage {
                message: format!("connect {}: {}", config.url, e),
            })?;
        let js = jetstream::new(client.clone());

        let committees = open_bucket(&js, &config.committees_bucket).await?;
        let settings = open_bucket(&js, &config.settings_bucket).await?;
        let members = open_bucket(&js, &config.members_bucket).await?;
        let projects = open_bucket(&js, &config.projects_bucket).await?;

        tracing::info!(url = %config.url, "connected to NATS");

        Ok(Self {
            repository: KvCommitteeRepository::new(
                Arc::new(committees),
                Arc::new(settings),
                Arc::new(members),
            ),
            projects: KvProjectReader::new(Arc::new(projects)),
            publisher: NatsPublisher::new(client.clone()),
            client,
        })
    }

    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }

    pub fn write_orchestrator(&self, config: OrchestratorConfig) -> WriteOrchestrator {
        WriteOrchestrator::new(
            Arc::new(self.projects.clone()),
            Arc::new(self.repository.clone()),
            Arc::new(self.publisher.clone()),
            config,
        )
    }

    pub fn read_orchestrator(&self) -> ReadOrchestrator {
        ReadOrchestrator::new(Arc::new(self.repository.clone()))
    }

    pub fn responder(&self) -> Responder {
        let handler = MessageHandler::new(Arc::new(self.read_orchestrator()));
        Responder::new(self.client.clone(), handler)
    }
}

async fn open_bucket(js: &jetstream::Context, bucket: &str) -> Result<NatsKv> {
    let store = js
        .get_key_value(bucket)
        .await
        .map_err(|e| CommitteeError::Storage {
            message: format!("open bucket {}: {}", bucket, e),
        })?;
    Ok(NatsKv::new(bucket, store))
}
