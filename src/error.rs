//! Error types for streamchat
//!
//! This module defines all error types used throughout the component and its
//! terminal host, using `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::turn::TurnState;

/// Main error type for streamchat operations
///
/// The first four variants are the turn failure kinds: each one ends the
/// current turn with the configured error message and none is retried. The
/// remaining variants cover configuration loading and the host binary.
#[derive(Error, Debug)]
pub enum StreamchatError {
    /// Connection failure, body read failure, or undecodable body
    #[error("Network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-2xx status
    #[error("HTTP error: status {status}")]
    HttpStatus {
        /// Status code returned by the endpoint
        status: u16,
    },

    /// The request deadline (or the idle gap between chunks) was exceeded
    #[error("Request timed out after {timeout_ms} ms")]
    Timeout {
        /// Configured deadline in milliseconds
        timeout_ms: u64,
    },

    /// Local, pre-request rejection by the rate limiter
    #[error("Rate limit exceeded: limit={limit}, {message}")]
    RateLimitExceeded {
        /// The configured limit that was exceeded
        limit: u32,
        /// User-facing rejection message
        message: String,
    },

    /// A turn was asked to move along an edge its state machine lacks
    #[error("Invalid turn transition: {from} -> {to}")]
    InvalidTransition {
        /// State the turn was in
        from: TurnState,
        /// State that was requested
        to: TurnState,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failed sends become `Network`; `error_for_status` failures keep their status
impl From<reqwest::Error> for StreamchatError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if !status.is_success() => Self::HttpStatus {
                status: status.as_u16(),
            },
            _ => Self::Network(err.to_string()),
        }
    }
}

/// Result type alias for streamchat operations
///
/// Uses `anyhow::Error` so setup code can attach context freely; turn
/// failures keep their typed [`StreamchatError`].
pub type Result<T> = anyhow::Result<T>;
