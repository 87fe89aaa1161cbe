//! Service configuration
//!
//! Defaults overlaid by environment variables (`COMMITTEE_PUBLISH_CONCURRENCY`,
//! `COMMITTEE_NATS__URL`, ...).

use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;

use crate::errors::{CommitteeError, Result};
use crate::logging_facility::Profile;

pub const DEFAULT_PUBLISH_CONCURRENCY: usize = 10;
pub const DEFAULT_SSO_MAX_ATTEMPTS: u32 = 100;
pub const DEFAULT_STALE_CLEANUP_TIMEOUT_MS: u64 = 10_000;

/// Full process configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub publish_concurrency: usize,
    pub sso_max_attempts: u32,
    pub stale_cleanup_timeout_ms: u64,
    pub log_profile: Profile,
    pub nats: NatsConfig,
}

/// NATS connection and bucket names
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    pub url: String,
    pub committees_bucket: String,
    pub settings_bucket: String,
    pub members_bucket: String,
    pub projects_bucket: String,
}

impl ServiceConfig {
    /// Load from defaults and `COMMITTEE_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when a variable cannot be parsed into its field.
    pub fn load() -> Result<Self> {
        Self::load_with_prefix("COMMITTEE")
    }

    /// Load using a custom environment prefix
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when a variable cannot be parsed into its field.
    pub fn load_with_prefix(prefix: &str) -> Result<Self> {
        let built = Config::builder()
            .set_default("publish_concurrency", DEFAULT_PUBLISH_CONCURRENCY as i64)
            .and_then(|b| b.set_default("sso_max_attempts", i64::from(DEFAULT_SSO_MAX_ATTEMPTS)))
            .and_then(|b| {
                b.set_default(
                    "stale_cleanup_timeout_ms",
                    DEFAULT_STALE_CLEANUP_TIMEOUT_MS as i64,
                )
            })
            .and_then(|b| b.set_default("log_profile", "development"))
            .and_then(|b| b.set_default("nats.url", "nats://127.0.0.1:4222"))
            .and_then(|b| b.set_default("nats.committees_bucket", "committees"))
            .and_then(|b| b.set_default("nats.settings_bucket", "committee-settings"))
            .and_then(|b| b.set_default("nats.members_bucket", "committee-members"))
            .and_then(|b| b.set_default("nats.projects_bucket", "projects"))
            .map_err(config_error)?
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_error)?;

        let cfg: ServiceConfig = built.try_deserialize().map_err(config_error)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.publish_concurrency == 0 {
            return Err(CommitteeError::InvalidInput {
                reason: "publish_concurrency must be at least 1".to_string(),
            });
        }
        if self.sso_max_attempts == 0 {
            return Err(CommitteeError::InvalidInput {
                reason: "sso_max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// The subset consumed by the orchestrators
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            publish_concurrency: self.publish_concurrency,
            sso_max_attempts: self.sso_max_attempts,
            stale_cleanup_timeout: Duration::from_millis(self.stale_cleanup_timeout_ms),
        }
    }
}

fn config_error(err: config::ConfigError) -> CommitteeError {
    CommitteeError::InvalidInput {
        reason: format!("configuration: {}", err),
    }
}

/// Tunables of the write orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Concurrency cap of the publish executor
    pub publish_concurrency: usize,
    /// Bound on SSO group name reservation attempts
    pub sso_max_attempts: u32,
    /// Deadline of the detached stale-key cleanup after an update
    pub stale_cleanup_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            publish_concurrency: DEFAULT_PUBLISH_CONCURRENCY,
            sso_max_attempts: DEFAULT_SSO_MAX_ATTEMPTS,
            stale_cleanup_timeout: Duration::from_millis(DEFAULT_STALE_CLEANUP_TIMEOUT_MS),
        }
    }
}
