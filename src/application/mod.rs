// Application layer - Polling and history use cases
pub mod history_feed;
pub mod poller;
pub mod telemetry_source;
