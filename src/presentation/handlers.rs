// HTTP request handlers
use crate::application::poller::PollStatsSnapshot;
use crate::domain::display::{format_time, DisplayField};
use crate::domain::history::BufferState;
use crate::domain::sample::{Sample, Timestamp};
use crate::presentation::app_state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct FieldReading {
    pub field: DisplayField,
    pub label: &'static str,
    /// Raw stored value
    pub value: Option<f64>,
    pub display: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryRow {
    pub timestamp: Timestamp,
    pub time: String,
    pub readings: Vec<FieldReading>,
}

impl HistoryRow {
    pub fn render(sample: &Sample, fields: &[DisplayField]) -> Self {
        let readings = fields
            .iter()
            .map(|&field| {
                let value = field.value(sample);
                FieldReading {
                    field,
                    label: field.label(),
                    value,
                    display: field.format(value),
                }
            })
            .collect();

        Self {
            timestamp: sample.timestamp.clone(),
            time: format_time(&sample.timestamp),
            readings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub capacity: usize,
    pub state: BufferState,
    /// Newest first
    pub rows: Vec<HistoryRow>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub poller: PollStatsSnapshot,
    pub buffered: usize,
    pub capacity: usize,
    pub state: BufferState,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current history, newest first
pub async fn get_history(State(state): State<Arc<AppState>>) -> Json<HistoryResponse> {
    let snapshot = state.history.snapshot();
    let rows = snapshot
        .samples
        .iter()
        .map(|sample| HistoryRow::render(sample, &state.fields))
        .collect();

    Json(HistoryResponse {
        capacity: snapshot.capacity,
        state: snapshot.state,
        rows,
    })
}

/// Newest accepted sample, or 204 before the first one arrives
pub async fn get_latest(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.history.snapshot();
    match snapshot.latest() {
        Some(sample) => Json(HistoryRow::render(sample, &state.fields)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = state.history.snapshot();

    Json(StatusResponse {
        poller: state.poll_stats.snapshot(),
        buffered: snapshot.samples.len(),
        capacity: snapshot.capacity,
        state: snapshot.state,
    })
}
