//! REST client for the remote comparison service.
//!
//! Wraps the two endpoints the orchestrator consumes — the long-running
//! compare call and the short progress poll — plus the health probe,
//! using [`reqwest`]. The base URL is injected at construction; there is
//! no ambient configuration.

use std::time::Duration;

use redline_core::types::TaskId;

use crate::types::{CompareRequest, CompareResponse, RemoteProgress};

/// Endpoint and timeout configuration for the remote service.
#[derive(Debug, Clone)]
pub struct CompareApiConfig {
    /// Base HTTP URL, e.g. `http://host:8080`.
    pub base_url: String,
    /// Bound on the primary compare call. Minutes-scale: the remote AI
    /// pipeline parses and analyses both documents before responding.
    pub compare_timeout: Duration,
    /// Bound on a single progress poll. Must stay below the poll cadence
    /// so a stalled query never backs up the polling loop.
    pub progress_timeout: Duration,
}

impl CompareApiConfig {
    /// Config with the standard timeouts (300 s compare, 3 s progress).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            compare_timeout: Duration::from_secs(300),
            progress_timeout: Duration::from_secs(3),
        }
    }
}

/// Errors from the remote service REST layer.
///
/// Only [`RemoteCompareApi::health`] surfaces these; `compare` and
/// `fetch_progress` fold failures into their return shapes.
#[derive(Debug, thiserror::Error)]
pub enum CompareApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("remote service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// HTTP client for a single remote comparison service.
pub struct RemoteCompareApi {
    client: reqwest::Client,
    config: CompareApiConfig,
}

impl RemoteCompareApi {
    /// Create a new client from a config.
    pub fn new(config: CompareApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across components).
    pub fn with_client(client: reqwest::Client, config: CompareApiConfig) -> Self {
        Self { client, config }
    }

    /// Base HTTP URL of the remote service.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Submit the primary comparison request and wait for its outcome.
    ///
    /// Blocks up to [`CompareApiConfig::compare_timeout`]. Transport
    /// failures, non-2xx responses, and unparseable bodies all come back
    /// as an error-shaped [`CompareResponse`] — this method never fails,
    /// so the orchestrator persists a clean `failed` state without
    /// distinguishing transport faults from remote faults.
    ///
    /// Triggers remote side effects exactly once per call; never retried
    /// here.
    pub async fn compare(
        &self,
        original_url: &str,
        amendment_url: &str,
        task_id: TaskId,
    ) -> CompareResponse {
        let body = CompareRequest {
            original_image: original_url,
            amendment_image: amendment_url,
            contract_id: task_id,
        };

        let send_result = self
            .client
            .post(format!("{}/api/v1/contracts/compare", self.config.base_url))
            .timeout(self.config.compare_timeout)
            .json(&body)
            .send()
            .await;

        let response = match send_result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%task_id, error = %e, "Compare request failed at transport level");
                return CompareResponse::from_transport_failure(format!(
                    "compare request failed: {e}"
                ));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(%task_id, status = status.as_u16(), "Compare request rejected");
            return CompareResponse::from_transport_failure(format!(
                "remote service returned {status}: {body}"
            ));
        }

        match response.json::<CompareResponse>().await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(%task_id, error = %e, "Malformed compare response");
                CompareResponse::from_transport_failure(format!("malformed compare response: {e}"))
            }
        }
    }

    /// Fetch current remote-side progress for a task.
    ///
    /// A single short call bounded by
    /// [`CompareApiConfig::progress_timeout`]. Returns `None` uniformly
    /// on any transport failure or non-success response — polling
    /// failures are never allowed to surface past this boundary.
    pub async fn fetch_progress(&self, task_id: TaskId) -> Option<RemoteProgress> {
        let response = self
            .client
            .get(format!(
                "{}/api/v1/jobs/{}/progress",
                self.config.base_url, task_id
            ))
            .timeout(self.config.progress_timeout)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        response.json::<RemoteProgress>().await.ok()
    }

    /// Probe the remote service's health endpoint.
    pub async fn health(&self) -> Result<(), CompareApiError> {
        let response = self
            .client
            .get(format!("{}/api/v1/health", self.config.base_url))
            .timeout(self.config.progress_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CompareApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
