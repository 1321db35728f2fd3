use std::time::Duration;

use thiserror::Error;

/// Failure of a single harvest operation.
///
/// Transport, status and timeout failures are recovered by
/// [`RetryPolicy`](crate::retry::RetryPolicy) until the attempt budget runs
/// out, at which point they surface as [`HarvestError::ExhaustedRetries`].
/// Only [`HarvestError::Config`] stops a run before it starts.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("gave up after {attempts} attempts, last error: {last}")]
    ExhaustedRetries {
        attempts: u32,
        last: Box<HarvestError>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to write results: {0}")]
    Write(String),
}

impl HarvestError {
    /// All non-success statuses are retried the same way, there is no
    /// distinction between 4xx and 5xx.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HarvestError::Transport(_) | HarvestError::Status { .. } | HarvestError::Timeout(_)
        )
    }
}

impl From<reqwest::Error> for HarvestError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            HarvestError::Parse(e.to_string())
        } else if let Some(status) = e.status() {
            HarvestError::Status {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            HarvestError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(e: serde_json::Error) -> Self {
        HarvestError::Parse(e.to_string())
    }
}
