//! Error types for snapshot creation
//!
//! Every fatal condition raised while building a snapshot is a
//! [`SnapshotError`]. The orchestrator catches it once, persists its
//! description as the job's failure reason and hands it back to the caller.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for snapshot operations
pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;

/// Error types for snapshot creation
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A required setting is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A call into the manager (or another upstream collaborator) failed
    #[error("Upstream call failed ({context}): {message}")]
    Upstream {
        /// What was being called, e.g. "dump plugins"
        context: String,
        /// Description reported by the collaborator
        message: String,
    },

    /// Writing a shard, blob or the final archive failed
    #[error("Archive write error: {0}")]
    ArchiveWrite(String),

    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A programming error: an internal contract was broken
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Coarse classification of a [`SnapshotError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or invalid configuration, raised before any phase runs
    Configuration,
    /// Any data-source failure
    UpstreamCall,
    /// Disk or permission failure while writing output
    ArchiveWrite,
    /// Internal contract broken
    Invariant,
}

impl SnapshotError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an upstream call error
    pub fn upstream(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an archive write error
    pub fn archive_write(msg: impl Into<String>) -> Self {
        Self::ArchiveWrite(msg.into())
    }

    /// Create an invariant violation
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Classify this error
    ///
    /// Malformed JSON can only come from a collaborator, so it counts as an
    /// upstream failure. Plain I/O errors come from our own writes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SnapshotError::Config(_) => ErrorCategory::Configuration,
            SnapshotError::Upstream { .. } | SnapshotError::Json(_) => ErrorCategory::UpstreamCall,
            SnapshotError::ArchiveWrite(_) | SnapshotError::Io(_) => ErrorCategory::ArchiveWrite,
            SnapshotError::InvariantViolation(_) => ErrorCategory::Invariant,
        }
    }
}
