//! Best-effort structured logging.
//!
//! A [`Diagnostics`] value is an explicit logger instance: a threshold plus a
//! sink. It is handed to every retrieval call instead of living in a global.
//! Nothing a sink does, whether it returns an error or panics, reaches
//! the caller.

use crate::core::{DalError, Result};
use serde::Deserialize;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl FromStr for LogLevel {
    type Err = DalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            other => Err(DalError::Config(format!("unknown log level '{}'", other))),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = DalError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        };
        f.write_str(token)
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Fatal => tracing::Level::ERROR,
        }
    }
}

/// Destination for diagnostic records.
pub trait LogSink: Send + Sync {
    fn write(&self, level: LogLevel, message: &str) -> Result<()>;
}

/// Forwards records to the `tracing` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, level: LogLevel, message: &str) -> Result<()> {
        match level {
            LogLevel::Trace => trace!("{}", message),
            LogLevel::Debug => debug!("{}", message),
            LogLevel::Info => info!("{}", message),
            LogLevel::Warn => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
            LogLevel::Fatal => error!(fatal = true, "{}", message),
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct Diagnostics {
    threshold: LogLevel,
    sink: Arc<dyn LogSink>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics::new(LogLevel::Info)
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics").field("threshold", &self.threshold).finish()
    }
}

impl Diagnostics {
    pub fn new(threshold: LogLevel) -> Self {
        Diagnostics {
            threshold,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(threshold: LogLevel, sink: Arc<dyn LogSink>) -> Self {
        Diagnostics { threshold, sink }
    }

    /// The same sink behind a different threshold.
    pub fn with_threshold(&self, threshold: LogLevel) -> Self {
        Diagnostics {
            threshold,
            sink: Arc::clone(&self.sink),
        }
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.threshold
    }

    /// Emits one record. Never fails and never panics.
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        if !self.enabled(level) {
            return;
        }
        let sink = &self.sink;
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            let text = message.to_string();
            sink.write(level, &text)
        }));
    }

    pub fn trace(&self, message: impl fmt::Display) {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(LogLevel::Error, message)
    }

    pub fn fatal(&self, message: impl fmt::Display) {
        self.log(LogLevel::Fatal, message)
    }
}

/// Installs a `tracing-subscriber` formatter for the whole process.
///
/// Returns `false` when a global subscriber was already set.
pub fn init_tracing(level: LogLevel) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(level))
        .try_init()
        .is_ok()
}
