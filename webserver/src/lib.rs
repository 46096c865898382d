//! Webserver library for the question generation service
//!
//! Accepts PDF uploads, starts session-scoped generation runs and streams
//! the generated questions back over server-sent events.

pub mod error;
pub mod state;
pub mod types;
pub mod web;
pub mod webserver_impl;

// Re-export main types
pub use error::{WebServerError, WebServerResult};
pub use state::{AppState, ServerConfig, DEFAULT_MAX_UPLOAD_BYTES};
pub use types::*;
pub use webserver_impl::{spawn_session_sweeper, WebServer};
