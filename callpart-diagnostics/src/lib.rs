//! # Call Part Diagnostics
//!
//! Debugging tools for group-call audio parts.
//! Provides logging setup and an offline replay of a part's reassignment
//! records.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod debug_logger;
pub mod part_analyzer;

use thiserror::Error;

/// Diagnostics error type
#[derive(Error, Debug)]
pub enum DiagnosticsError {
    /// The log filter directive could not be parsed
    #[error("Logging initialization failed: {reason}")]
    LoggingInit {
        /// Failure reason
        reason: String,
    },

    /// Report serialization failed
    #[error("Report serialization failed: {source}")]
    Serialization {
        /// Underlying serializer error
        #[from]
        source: serde_json::Error,
    },
}

// Re-export main types
pub use debug_logger::DebugLogger;
pub use part_analyzer::{PartAnalyzer, PartReport, TimelineEntry};
