//! Error types for i2ctout.
//!
//! This module defines all error types used throughout the i2ctout crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for i2ctout operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Argument Errors ===
    /// The timeout is outside the range the `TOUT` field can hold.
    #[error("timeout value must be 1 to 65535 (got {value})")]
    TimeoutOutOfRange {
        /// The rejected value.
        value: i64,
    },

    /// The timeout could not be parsed as an integer.
    #[error("invalid timeout '{input}': {reason}")]
    InvalidTimeout {
        /// The text as given.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The base address could not be parsed or is unusable.
    #[error("invalid base address '{input}': {reason}")]
    InvalidAddress {
        /// The text as given.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    // === Device Errors ===
    /// Physical memory could not be mapped, accessed or unmapped.
    #[error(transparent)]
    Memory(#[from] i2ctout_linux::MapError),

    /// The memory device path is empty or otherwise unusable.
    #[error("invalid memory device {path}: {message}")]
    Device {
        /// Configured device path.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Platform Errors ===
    /// Physical memory access is not available on this platform.
    #[error("unsupported platform: {0}")]
    Unsupported(String),

    // === Serialization Errors ===
    /// JSON serialization failed.
    #[error("failed to serialize JSON output")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for i2ctout operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid address error.
    #[must_use]
    pub fn invalid_address(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported platform error.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }
}
