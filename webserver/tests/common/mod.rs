//! Common test utilities for webserver integration tests

pub mod fixtures;
pub mod helpers;

pub use fixtures::{MultipartBody, TestFixtures};
pub use helpers::{
    body_json, read_events, test_server, test_server_with, web_server, CannedBackend, SseFrame,
    TestServer,
};
