// Source trait for the latest telemetry sample
use crate::domain::sample::Sample;
use async_trait::async_trait;
use thiserror::Error;

/// Why a poll cycle produced nothing. None of these stop the poller.
#[derive(Debug, Error)]
pub enum PollError {
    /// Connection refused, timeout, or any other failure before a response arrived
    #[error("transport error: {0}")]
    Transport(String),

    #[error("telemetry endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not a JSON array of samples
    #[error("failed to decode telemetry response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Fetch the newest sample, or `None` when the source has no samples yet
    async fn fetch_latest(&self) -> Result<Option<Sample>, PollError>;
}
