//! Wire types for the remote comparison service's HTTP API.

use redline_core::task::ComparisonOutcome;
use redline_core::types::TaskId;
use serde::{Deserialize, Serialize};

/// Remote label for a successfully completed comparison.
pub const STATUS_SUCCESS: &str = "success";
/// Remote label for a reported failure.
pub const STATUS_ERROR: &str = "error";

/// Body of `POST /api/v1/contracts/compare`.
#[derive(Debug, Serialize)]
pub struct CompareRequest<'a> {
    /// Time-limited URL of the original contract document.
    pub original_image: &'a str,
    /// Time-limited URL of the amendment document.
    pub amendment_image: &'a str,
    /// Correlation id: the platform task id doubles as the remote job id.
    pub contract_id: TaskId,
}

/// Response of the compare endpoint.
///
/// Transport-level failures (timeout, connection error, malformed body)
/// are folded into this shape by the client — `status == "error"` with an
/// error message — so callers handle exactly one failure channel.
#[derive(Debug, Clone, Deserialize)]
pub struct CompareResponse {
    /// `"success"` or `"error"` as reported by the remote service.
    pub status: String,

    /// The extracted changes; present on success.
    #[serde(default)]
    pub result: Option<ComparisonOutcome>,

    /// Remote observability trace id, when the service returned one.
    #[serde(default)]
    pub trace_id: Option<String>,

    /// Remote-side processing duration.
    #[serde(default)]
    pub processing_time_ms: Option<i64>,

    /// Error description; present on failure.
    #[serde(default)]
    pub error: Option<String>,
}

impl CompareResponse {
    /// Whether the remote service reported success with a usable result.
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS && self.result.is_some()
    }

    /// Shape a transport-level failure as a remote failure response.
    pub fn from_transport_failure(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            result: None,
            trace_id: None,
            processing_time_ms: None,
            error: Some(message.into()),
        }
    }

    /// Error text to persist for a non-success response.
    pub fn error_text(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| format!("remote service returned status '{}'", self.status))
    }
}

/// Response of `GET /api/v1/jobs/{contract_id}/progress`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProgress {
    /// Remote-side status label (e.g. `"processing"`).
    pub status: String,
    /// Completion percentage (0-100); the producer does not guarantee
    /// monotonicity and neither do we.
    pub progress: u8,
    /// Pipeline step label (e.g. `"Step 3/5"`).
    #[serde(default)]
    pub step: Option<String>,
    /// Human-readable description of the current stage.
    #[serde(default)]
    pub message: String,
}
