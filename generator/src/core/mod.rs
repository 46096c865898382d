//! Generator core logic, free of I/O

pub mod planner;
pub mod processor;
pub mod prompt;

pub use planner::{plan, ChunkPlan, ChunkPlanner};
pub use processor::{flatten_items, merge_save_data, unwrap_singleton, SAVE_DATA_KEY};
pub use prompt::{build_prompt, response_schema};
