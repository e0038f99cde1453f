//! Shared utilities for Farebox: configuration, logging, error types.
//!
//! This crate provides common infrastructure used across all Farebox components.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod rpc;

pub use config::{EndpointConfig, EscrowConfig};
pub use error::{Error, Result};

/// Initialize tracing.
///
/// The `RUST_LOG` environment variable takes precedence; `default_level`
/// applies when it is not set.
pub fn init_tracing_with_default(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
