//! Logger collaborator.
//!
//! Handles report setup failures and diagnostics through a [`Logger`]
//! trait object held by their config. The default implementation,
//! [`TracingLogger`], forwards to `tracing` events.

use std::fmt;
use std::sync::Arc;

/// Log verbosity for a [`Logger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum LogLevel {
    /// Nothing is logged.
    Silent = 1,
    /// Only errors.
    Error = 2,
    /// Errors and warnings.
    #[default]
    Warn = 3,
    /// Everything, including informational messages.
    Info = 4,
}

impl LogLevel {
    /// Parse a log level from a string.
    ///
    /// Accepts: "silent", "error", "warn", "info" (case-insensitive).
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "silent" | "off" | "none" => Some(Self::Silent),
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    /// Get the level name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Silent => "SILENT",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured logging sink used by handles.
pub trait Logger: Send + Sync + fmt::Debug {
    /// A logger like this one but at `level`.
    fn log_mode(&self, level: LogLevel) -> Arc<dyn Logger>;

    /// Current verbosity.
    fn level(&self) -> LogLevel;

    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);
}

/// Default logger: forwards to `tracing` events, filtered by its own level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger {
    level: LogLevel,
}

impl TracingLogger {
    pub const fn new(level: LogLevel) -> Self {
        Self { level }
    }
}

impl Logger for TracingLogger {
    fn log_mode(&self, level: LogLevel) -> Arc<dyn Logger> {
        Arc::new(Self { level })
    }

    fn level(&self) -> LogLevel {
        self.level
    }

    fn info(&self, message: &str) {
        if self.level >= LogLevel::Info {
            tracing::info!(target: "sqlhandle", "{}", message);
        }
    }

    fn warn(&self, message: &str) {
        if self.level >= LogLevel::Warn {
            tracing::warn!(target: "sqlhandle", "{}", message);
        }
    }

    fn error(&self, message: &str) {
        if self.level >= LogLevel::Error {
            tracing::error!(target: "sqlhandle", "{}", message);
        }
    }
}

/// The logger a config gets when none is supplied.
pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(TracingLogger::default())
}
