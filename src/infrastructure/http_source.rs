// HTTP telemetry source - GET {base_url}/data
use crate::application::telemetry_source::{PollError, TelemetrySource};
use crate::domain::sample::Sample;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpTelemetrySource {
    data_url: String,
    client: reqwest::Client,
}

impl HttpTelemetrySource {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            data_url: format!("{}/data", base_url.trim_end_matches('/')),
            client,
        })
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    async fn fetch_samples(&self) -> Result<Vec<Sample>, PollError> {
        let response = self
            .client
            .get(&self.data_url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_else(|e| {
                tracing::debug!(status, error = %e, "Failed to read error response body");
                String::new()
            });
            return Err(PollError::Status { status, body });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| PollError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TelemetrySource for HttpTelemetrySource {
    async fn fetch_latest(&self) -> Result<Option<Sample>, PollError> {
        let samples = self.fetch_samples().await?;
        tracing::trace!(count = samples.len(), url = %self.data_url, "Fetched samples");

        // Backend orders newest first.
        Ok(samples.into_iter().next())
    }
}
