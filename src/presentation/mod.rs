// Presentation layer - Render sink over HTTP
pub mod app_state;
pub mod handlers;
