//! Structured debug logging setup

use crate::DiagnosticsError;
use tracing_subscriber::EnvFilter;

/// Default filter when neither caller nor environment provide one
pub const DEFAULT_FILTER: &str = "callpart=info,callpart_media=info,callpart_core=warn";

/// Debug logger for structured logging
#[derive(Debug, Default)]
pub struct DebugLogger;

impl DebugLogger {
    /// Install a fmt subscriber
    ///
    /// `RUST_LOG` wins over `default_filter`. Returns `Ok(false)` when a
    /// global subscriber was already installed.
    pub fn init_logging(default_filter: Option<&str>) -> Result<bool, DiagnosticsError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(default_filter.unwrap_or(DEFAULT_FILTER)).map_err(|e| {
                DiagnosticsError::LoggingInit {
                    reason: e.to_string(),
                }
            })?,
        };

        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!("Logging initialized");
        }
        Ok(installed)
    }
}
