// Application state for HTTP handlers
use crate::application::history_feed::HistoryView;
use crate::application::poller::PollStats;
use crate::domain::display::DisplayField;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub history: HistoryView,
    pub fields: Vec<DisplayField>,
    pub poll_stats: Arc<PollStats>,
}
