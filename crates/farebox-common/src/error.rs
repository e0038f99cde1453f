//! Common error types for Farebox.
//!
//! Every variant here is fatal to the session that raised it: the
//! payment-gating flow has no step that may be silently retried or
//! skipped without risking an unauthorized media path.

use thiserror::Error;

/// Result type alias using Farebox's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for Farebox operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file, network, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Signaling channel unreachable or response malformed
    #[error("signaling error: {0}")]
    Signaling(String),

    /// Transport state invalid for the requested negotiation step
    #[error("negotiation error: {0}")]
    Negotiation(String),

    /// Funding source refused or under-delivered
    #[error("funding error: {0}")]
    Funding(String),

    /// Ledger submission failed, was rejected, or never confirmed
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Gatekeeper denied the relay or was unreachable
    #[error("gatekeeper error: {0}")]
    Gatekeeper(String),

    /// No relay-capable candidate survived the splice
    #[error("splice error: {0}")]
    Splice(String),

    /// Local media source failure
    #[error("media error: {0}")]
    Media(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation timed out
    #[error("timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Create a signaling error from any displayable type.
    pub fn signaling(msg: impl std::fmt::Display) -> Self {
        Self::Signaling(msg.to_string())
    }

    /// Create a negotiation error from any displayable type.
    pub fn negotiation(msg: impl std::fmt::Display) -> Self {
        Self::Negotiation(msg.to_string())
    }

    /// Create a funding error from any displayable type.
    pub fn funding(msg: impl std::fmt::Display) -> Self {
        Self::Funding(msg.to_string())
    }

    /// Create a ledger error from any displayable type.
    pub fn ledger(msg: impl std::fmt::Display) -> Self {
        Self::Ledger(msg.to_string())
    }

    /// Create a gatekeeper error from any displayable type.
    pub fn gatekeeper(msg: impl std::fmt::Display) -> Self {
        Self::Gatekeeper(msg.to_string())
    }

    /// Create a splice error from any displayable type.
    pub fn splice(msg: impl std::fmt::Display) -> Self {
        Self::Splice(msg.to_string())
    }

    /// Create a media error from any displayable type.
    pub fn media(msg: impl std::fmt::Display) -> Self {
        Self::Media(msg.to_string())
    }

    /// Create a config error from any displayable type.
    pub fn config(msg: impl std::fmt::Display) -> Self {
        Self::Config(msg.to_string())
    }

    /// Create a timeout error from any displayable type.
    pub fn timeout(msg: impl std::fmt::Display) -> Self {
        Self::Timeout(msg.to_string())
    }
}
