//! HTTP handlers

pub mod documents;
pub mod health;
