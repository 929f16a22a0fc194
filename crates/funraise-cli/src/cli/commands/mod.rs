//! CLI command handlers.

pub mod config;
pub mod refresh;
pub mod search;
