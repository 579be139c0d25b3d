//! Error types for NAT lifecycle operations.
//!
//! All errors implement `std::error::Error` via `thiserror`. The variants
//! follow the phases of a run: talking to the router, decoding the expiry
//! convention, delivering notifications and validating configuration.

use std::io;
use thiserror::Error;

/// Result type alias for NAT lifecycle operations.
pub type NatMgrResult<T> = Result<T, NatMgrError>;

/// Errors that can occur while managing NAT server mappings.
#[derive(Debug, Error)]
pub enum NatMgrError {
    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// Router session or CLI operation failed.
    #[error("Transport operation failed: {operation}: {message}")]
    Transport {
        /// The operation that failed (e.g., "fetch", "delete").
        operation: String,
        /// Error message.
        message: String,
    },

    /// The expiry marker in a description could not be decoded.
    #[error("Failed to decode expiry from description '{description}': {reason}")]
    Decode {
        /// The raw description text.
        description: String,
        /// Why decoding failed.
        reason: String,
    },

    /// Notification could not be delivered.
    #[error("Notification delivery to '{channel}' failed: {message}")]
    Delivery {
        /// The channel name.
        channel: String,
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// The run did not finish within its deadline.
    #[error("Run timed out after {seconds} seconds")]
    Timeout {
        /// The deadline in seconds.
        seconds: u64,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl NatMgrError {
    /// Creates a transport error.
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(description: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            description: description.into(),
            reason: reason.into(),
        }
    }

    /// Creates a delivery error.
    pub fn delivery(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error aborts a run no matter where it occurs.
    ///
    /// Transport errors are fatal only during the fetch phase, which the
    /// orchestrator decides on its own.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NatMgrError::InvalidConfig { .. } | NatMgrError::Timeout { .. }
        )
    }
}
