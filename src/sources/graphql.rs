use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AppResult, SourceError};
use crate::ledger::models::Source;
use crate::sources::models::{appchain_query, settlement_query};

/// Anything that can hand back one source's raw result document
#[async_trait]
pub trait RewardSource: Send + Sync {
    fn layer(&self) -> Source;

    /// Single attempt, no retry
    async fn fetch(&self) -> Result<Value, SourceError>;
}

/// GraphQL endpoint serving one reward collection
pub struct GraphQlSource {
    client: Client,
    endpoint: String,
    layer: Source,
    query: String,
}

impl GraphQlSource {
    pub fn new(layer: Source, endpoint: &str, query: String, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            layer,
            query,
        })
    }

    /// Source for `layer` as configured
    pub fn from_config(layer: Source, config: &Config) -> AppResult<Self> {
        let (endpoint, query) = match layer {
            Source::Settlement => (&config.settlement_endpoint, settlement_query(config.query_limit)),
            Source::Appchain => (&config.appchain_endpoint, appchain_query(config.query_limit)),
        };
        Self::new(
            layer,
            endpoint,
            query,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn unreachable(&self, e: impl std::fmt::Display) -> SourceError {
        SourceError::Unreachable {
            layer: self.layer,
            message: format!("{}: {}", self.endpoint, e),
        }
    }
}

#[async_trait]
impl RewardSource for GraphQlSource {
    fn layer(&self) -> Source {
        self.layer
    }

    async fn fetch(&self) -> Result<Value, SourceError> {
        info!("📡 Fetching {} rewards from {}", self.layer, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": self.query }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.unreachable(e))?;

        let body: Value = response.json().await.map_err(|e| self.unreachable(e))?;

        if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
            error!("❌ GraphQL errors from {}: {}", self.endpoint, errors);
            return Err(SourceError::GraphQl {
                layer: self.layer,
                errors: errors.to_string(),
            });
        }

        Ok(body)
    }
}
