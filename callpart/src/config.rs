//! Configuration types and defaults

#[cfg(feature = "diagnostics")]
use callpart_diagnostics::{DebugLogger, DiagnosticsError};

/// Global configuration
#[derive(Debug, Clone, Default)]
pub struct GlobalConfig {
    /// Install a log subscriber at init
    pub debug_logging: bool,
    /// Filter directives used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
}

impl GlobalConfig {
    /// Install the log subscriber if `debug_logging` is set
    ///
    /// Returns whether this call installed it.
    #[cfg(feature = "diagnostics")]
    pub fn init_logging(&self) -> Result<bool, DiagnosticsError> {
        if !self.debug_logging {
            return Ok(false);
        }
        DebugLogger::init_logging(self.log_filter.as_deref())
    }
}

/// Per-part configuration
#[derive(Debug, Clone)]
pub struct PartConfig {
    /// Container format hint passed to the parser
    pub container: String,
    /// Pass decoder slots through instead of demultiplexing by speaker
    pub single_channel: bool,
}

impl Default for PartConfig {
    fn default() -> Self {
        Self {
            container: "ogg".to_string(),
            single_channel: false,
        }
    }
}

impl PartConfig {
    /// Configuration for slot pass-through parts
    pub fn single_channel() -> Self {
        Self {
            single_channel: true,
            ..Self::default()
        }
    }
}
