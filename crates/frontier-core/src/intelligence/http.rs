//! HTTP intelligence provider.
//!
//! POSTs `{"request_type", "model", "payload"}` as JSON to one endpoint and
//! expects JSON back, either bare or wrapped as `{"result": ...}`. Calls are
//! bounded by the configured timeout both at the client and around the
//! whole exchange.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::runtime::Runtime;

use super::{IntelligenceProvider, RequestType};
use crate::error::ProviderError;
use crate::storage::IntelligenceConfig;

const USER_AGENT: &str = "frontier";

/// Blocking provider backed by its own current-thread tokio runtime.
///
/// Must be called and dropped from synchronous code only. Calling
/// [`IntelligenceProvider::request`] or dropping the provider from inside
/// an async context panics, since tokio forbids blocking on or shutting
/// down a runtime there. Async callers should move it into
/// `tokio::task::spawn_blocking`.
pub struct HttpProvider {
    client: Client,
    runtime: Runtime,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpProvider {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("runtime: {e}")))?;

        Ok(Self {
            client,
            runtime,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            timeout,
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Provider for `config`, `None` when disabled or without endpoint.
    ///
    /// The API key is read from the environment variable the config names.
    pub fn from_config(config: &IntelligenceConfig) -> Result<Option<Self>, ProviderError> {
        if !config.enabled {
            return Ok(None);
        }
        let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) else {
            tracing::warn!("intelligence enabled without an endpoint");
            return Ok(None);
        };

        let mut provider = Self::new(endpoint, config.model.clone(), Duration::from_secs(config.timeout_secs))?;
        if let Ok(key) = std::env::var(&config.api_key_env) {
            if !key.is_empty() {
                provider = provider.with_api_key(key);
            }
        }
        Ok(Some(provider))
    }

    async fn send(&self, kind: RequestType, payload: &Value) -> Result<Value, ProviderError> {
        let body = json!({
            "request_type": kind,
            "model": self.model,
            "payload": payload,
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(ProviderError::Http {
                status: resp.status().as_u16(),
            });
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(match data {
            Value::Object(mut map) if map.contains_key("result") => map.remove("result").unwrap_or(Value::Null),
            other => other,
        })
    }
}

impl IntelligenceProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn request(&self, kind: RequestType, payload: &Value) -> Result<Value, ProviderError> {
        let secs = self.timeout.as_secs();
        self.runtime.block_on(async {
            match tokio::time::timeout(self.timeout, self.send(kind, payload)).await {
                Ok(Err(ProviderError::Timeout { .. })) | Err(_) => Err(ProviderError::Timeout { secs }),
                Ok(result) => result,
            }
        })
    }
}
