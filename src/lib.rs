// Live telemetry history: polls a backend and keeps a bounded, deduplicated series
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;
