//! HTTP implementation of the metrics client port.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client as ReqwestClient;
use serde_json::Value;
use tracing::{debug, instrument};

use super::errors::MetricsApiError;
use crate::domain::models::{MetricsConfig, TimeWindow};
use crate::domain::ports::MetricsClient;

/// Configuration for the HTTP metrics client
#[derive(Debug, Clone)]
pub struct HttpMetricsClientConfig {
    /// Base URL, without trailing slash
    pub base_url: String,

    /// Bearer token sent on every request when set
    pub api_key: Option<String>,

    /// Whole-request timeout
    pub timeout_secs: u64,
}

impl From<&MetricsConfig> for HttpMetricsClientConfig {
    fn from(config: &MetricsConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// reqwest-backed metrics API client
///
/// Each call is a single GET; failures are classified into
/// [`MetricsApiError`] and never retried here.
pub struct HttpMetricsClient {
    http_client: ReqwestClient,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl HttpMetricsClient {
    pub fn new(config: HttpMetricsClientConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn from_config(config: &MetricsConfig) -> Result<Self> {
        Self::new(HttpMetricsClientConfig::from(config))
    }

    fn window_params(window: &TimeWindow) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("since", window.since.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("to", window.to.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ];
        if let Some(channel) = &window.channel {
            params.push(("channel", channel.clone()));
        }
        params
    }

    async fn get_json(&self, path: &str, params: &[(&'static str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "metrics API request");

        let mut request = self.http_client.get(&url).query(params);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MetricsApiError::from_transport(e, self.timeout_secs))
            .with_context(|| format!("Failed to send request to {path}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(MetricsApiError::from_status(status, body))
                .with_context(|| format!("Metrics API returned {status} for {path}"));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MetricsApiError::from_transport(e, self.timeout_secs))
            .with_context(|| format!("Failed to read response body from {path}"))?;

        serde_json::from_str(&body)
            .map_err(|e| MetricsApiError::InvalidJson(e.to_string()))
            .with_context(|| format!("Failed to parse response from {path}"))
    }
}

#[async_trait]
impl MetricsClient for HttpMetricsClient {
    #[instrument(skip(self))]
    async fn get_workspaces(&self) -> Result<Value> {
        self.get_json("/workspaces", &[]).await
    }

    #[instrument(skip(self, window), fields(since = %window.since, to = %window.to))]
    async fn get_narratives(&self, workspace_id: u64, window: &TimeWindow) -> Result<Value> {
        self.get_json(
            &format!("/workspaces/{workspace_id}/narratives"),
            &Self::window_params(window),
        )
        .await
    }

    #[instrument(skip(self, window), fields(since = %window.since, to = %window.to))]
    async fn get_mentions(&self, workspace_id: u64, window: &TimeWindow) -> Result<Value> {
        self.get_json(
            &format!("/workspaces/{workspace_id}/mentions"),
            &Self::window_params(window),
        )
        .await
    }
}
