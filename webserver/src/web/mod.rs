//! Web layer

pub mod handlers;
