//! Shared logging utilities for consistent tracing across all crates

use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Build the env-filter directive string for a component
///
/// The component's own crate, the core crates and the HTTP stack get
/// separate levels so that noisy dependencies stay quiet.
pub fn filter_directives(component: &str, log_level: Option<&str>) -> String {
    let base_level = log_level.unwrap_or("info");
    format!(
        "{component}={base_level},generator={base_level},shared={base_level},tower_http={base_level},axum={base_level},reqwest=warn,hyper=warn"
    )
}

/// Initialize the tracing subscriber for a component
///
/// `RUST_LOG`, when set, replaces the computed directives.
pub fn init_tracing(component: &str, log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(component, log_level)));

    let result = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init();

    if result.is_err() {
        tracing::debug!("Tracing subscriber already initialized");
    }
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for session-aware info logging
#[macro_export]
macro_rules! session_info {
    ($session_id:expr, $($arg:tt)*) => {
        tracing::info!(
            session = %$session_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for session-aware warning logging
#[macro_export]
macro_rules! session_warn {
    ($session_id:expr, $($arg:tt)*) => {
        tracing::warn!(
            session = %$session_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for session-aware error logging
#[macro_export]
macro_rules! session_error {
    ($session_id:expr, $($arg:tt)*) => {
        tracing::error!(
            session = %$session_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for session-aware debug logging
#[macro_export]
macro_rules! session_debug {
    ($session_id:expr, $($arg:tt)*) => {
        tracing::debug!(
            session = %$session_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(component: &str, details: &str) {
    info!(
        component = component,
        timestamp = format_timestamp(),
        "Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(component: &str, reason: &str) {
    info!(
        component = component,
        timestamp = format_timestamp(),
        "Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(component: &str, context: &str, error: &dyn std::fmt::Display) {
    error!(
        component = component,
        timestamp = format_timestamp(),
        error = %error,
        "{} failed: {}",
        context,
        error
    );
}
