//! Domain-level error types for adb-tether.
//!
//! All errors are typed with `thiserror`. Guard aborts (ambiguous device
//! sets, no known address) are not errors: they are reported as cycle
//! outcomes, see [`crate::domain::AbortReason`].

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// The external tool failed to run, exited non-zero or wrote an
    /// unrecognized diagnostic to stderr.
    #[error("Transport failure: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The external tool did not finish within the configured timeout.
    #[error("Command `{command}` timed out after {}s", .after.as_secs())]
    Timeout { command: String, after: Duration },

    /// A connection attempt did not get the exact confirmation for `address`.
    #[error("Failed to connect to {address}")]
    Connect { address: String },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The cached address file could not be used.
    #[error("Address file error at {}: {message}", .path.display())]
    AddressFile {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a transport failure without an underlying OS error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport failure caused by a process spawn/wait error.
    pub fn spawn(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a connect failure for `address`.
    pub fn connect(address: impl Into<String>) -> Self {
        Self::Connect {
            address: address.into(),
        }
    }

    /// Create an address file error with context.
    pub fn address_file(
        path: &std::path::Path,
        message: impl Into<String>,
        err: std::io::Error,
    ) -> Self {
        Self::AddressFile {
            path: path.to_path_buf(),
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Whether this error came from the external tool rather than from
    /// local storage or configuration.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::Connect { .. }
        )
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
