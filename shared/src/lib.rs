//! Shared types for the question generation system
//!
//! Contains the value types passed between the generation core and the
//! HTTP surface, the shared validation error, and tracing setup.

pub mod types;
pub mod errors;
pub mod logging;

pub use types::*;
pub use errors::*;
