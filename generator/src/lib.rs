//! Question generation core
//!
//! Splits an uploaded document into page chunks, asks a structured-output
//! backend for questions on each chunk with bounded concurrency, and
//! publishes the numbered results on a per-session channel until the
//! requested count is reached.

pub mod config;
pub mod core;
pub mod error;
pub mod pipeline_impl;
pub mod services;
pub mod traits;
pub mod types;

pub use config::{BackendConfig, PipelineConfig, PlannerLimits, SessionConfig};
pub use crate::core::{plan, ChunkPlan, ChunkPlanner};
pub use error::{ChunkError, ExtractionError, GenerationError, GeneratorError, GeneratorResult};
pub use pipeline_impl::{GenerationPipeline, RunHandle};
pub use services::*;
pub use traits::*;
pub use types::*;
