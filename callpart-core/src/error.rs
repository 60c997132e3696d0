//! Error types for streaming part parsing

use thiserror::Error;

/// Main error type for part parsing operations
#[derive(Error, Debug)]
pub enum PartError {
    /// A fixed-size field ran past the end of the buffer
    #[error("Truncated input: {field} at offset {offset}")]
    Truncated {
        /// Name of the field being read
        field: &'static str,
        /// Offset where the read was attempted
        offset: usize,
    },

    /// The container bytes are structurally invalid
    #[error("Invalid container: {reason}")]
    InvalidContainer {
        /// Reason the container was rejected
        reason: String,
    },

    /// No reader exists for the requested container format
    #[error("Unsupported container: {container}")]
    UnsupportedContainer {
        /// Container format hint supplied by the caller
        container: String,
    },

    /// A metadata tag could not be decoded
    #[error("Invalid metadata tag {key}: {reason}")]
    InvalidMetadata {
        /// Tag key
        key: String,
        /// Failure reason
        reason: String,
    },

    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

/// Result type alias for part parsing operations
pub type PartResult<T> = Result<T, PartError>;

impl PartError {
    /// Check if the part can still be played after this error
    ///
    /// Broken metadata only costs reassignment information; everything else
    /// leaves nothing to decode.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PartError::InvalidMetadata { .. })
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            PartError::Truncated { .. } => ErrorCategory::Data,
            PartError::InvalidContainer { .. } => ErrorCategory::Format,
            PartError::UnsupportedContainer { .. } => ErrorCategory::Format,
            PartError::InvalidMetadata { .. } => ErrorCategory::Metadata,
            PartError::Io { .. } => ErrorCategory::System,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// System-level errors
    System,
    /// Container structure errors
    Format,
    /// Short or malformed binary data
    Data,
    /// Metadata tag errors
    Metadata,
}
