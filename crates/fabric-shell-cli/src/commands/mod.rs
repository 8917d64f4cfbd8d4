//! CLI command implementations.

pub mod config;
pub mod connect;
pub mod node;
pub mod version;
