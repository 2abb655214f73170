// Domain layer - Telemetry samples and the bounded history
pub mod display;
pub mod history;
pub mod sample;
