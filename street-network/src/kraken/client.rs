//! Engine RPC client.
//!
//! The engine's street-network sub-service is reached through [`EngineRpc`]
//! so the adapter can be tested against a scripted engine. The HTTP
//! implementation posts the JSON envelope to `{base_url}/street_network`.

use async_trait::async_trait;

use crate::breaker::CallError;

use super::types::{EngineRequest, EngineResponse};

/// Default request timeout at the HTTP layer, in seconds.
///
/// The circuit breaker applies the per-backend timeout; this only bounds
/// connections that never answer.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum response body kept in error messages.
const MAX_ERROR_BODY: usize = 500;

/// Transport to the engine's street-network sub-service.
#[async_trait]
pub trait EngineRpc: Send + Sync {
    /// Send one request and wait for its response.
    async fn send(&self, request: &EngineRequest) -> Result<EngineResponse, CallError>;
}

/// Configuration for the HTTP engine client.
#[derive(Debug, Clone)]
pub struct EngineClientConfig {
    /// Base URL of the engine (e.g. `http://kraken:9090`)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl EngineClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// JSON-over-HTTP engine client.
#[derive(Debug, Clone)]
pub struct HttpEngineClient {
    http: reqwest::Client,
    url: String,
}

impl HttpEngineClient {
    pub fn new(config: EngineClientConfig) -> Result<Self, CallError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: format!("{}/street_network", config.base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl EngineRpc for HttpEngineClient {
    async fn send(&self, request: &EngineRequest) -> Result<EngineResponse, CallError> {
        let response = self.http.post(&self.url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| CallError::Decode {
            message: format!(
                "{e} (body: {})",
                body.chars().take(MAX_ERROR_BODY).collect::<String>()
            ),
        })
    }
}
