//! Common test utilities for generator integration tests

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{collect_run, FakeExtractor, InFlight, ScriptedBackend};
