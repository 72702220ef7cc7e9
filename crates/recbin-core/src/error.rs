//! Error types for recycle-bin parsing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while scanning a recycle bin.
///
/// Only [`RecbinError::Io`] (for the trash root itself) and
/// [`RecbinError::Config`] reach callers of the top-level scan; the other
/// variants describe per-item failures that are logged and skipped.
#[derive(Error, Debug)]
pub enum RecbinError {
    #[error("Malformed index record: {reason}")]
    MalformedRecord { reason: String },

    #[error("Unreadable content file {}: {source}", .path.display())]
    UnreadableContent {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Timestamp {seconds} is outside the representable range")]
    TimestampConversion { seconds: i64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Trash walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid account configuration: {0}")]
    Config(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RecbinError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        RecbinError::MalformedRecord {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecbinError>;
