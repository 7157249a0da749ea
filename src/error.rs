// In: src/error.rs

//! This module defines the single, unified error type for the entire evstore library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use crate::types::RecordCategory;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    // =========================================================================
    // === Writer Errors (the stream-level taxonomy)
    // =========================================================================
    /// A selected column had no value and no substitute was permitted.
    /// Aborts the current record only; the file stays open.
    #[error("Missing mandatory {category} column '{column}'")]
    MissingMandatoryColumn {
        category: RecordCategory,
        column: String,
    },

    /// Index, tables and provenance disagree. Fatal for the stream.
    #[error("Index consistency failure (this is a bug): {0}")]
    IndexConsistencyFailure(String),

    /// The storage backend failed to write. Fatal for the stream, never retried.
    #[error("Write to '{}' failed: {source}", .path.display())]
    FileSystemFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Returned by every mutating call after a fatal error.
    #[error("Output stream aborted after a fatal error: {0}")]
    StreamAborted(String),

    #[error("Invalid output configuration: {0}")]
    InvalidConfiguration(String),

    // =========================================================================
    // === Format Errors (reader side and frame codecs)
    // =========================================================================
    #[error("Frame serialization/deserialization failed: {0}")]
    FrameFormatError(String),

    #[error("Zstd operation failed: {0}")]
    ZstdError(String),

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the Arrow library.
    #[error("Arrow operation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically during registry/footer serialization.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// A selection rule that is not a valid pattern.
    #[error("Invalid selection pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl OutputError {
    /// Fatal errors terminate the write stream; everything else only aborts
    /// the operation that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OutputError::IndexConsistencyFailure(_)
                | OutputError::FileSystemFailure { .. }
                | OutputError::StreamAborted(_)
                | OutputError::InternalError(_)
                | OutputError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OutputError::MissingMandatoryColumn {
            category: RecordCategory::Event,
            column: "tracks_reco".to_string(),
        };
        assert_eq!(format!("{}", err), "Missing mandatory Event column 'tracks_reco'");
    }

    #[test]
    fn test_fatal_classification() {
        let missing = OutputError::MissingMandatoryColumn {
            category: RecordCategory::Run,
            column: "x".to_string(),
        };
        assert!(!missing.is_fatal());
        assert!(OutputError::IndexConsistencyFailure("x".into()).is_fatal());
        let fs = OutputError::FileSystemFailure {
            path: PathBuf::from("out.evs"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert!(fs.is_fatal());
    }
}
