//! Severity-filtered line logger.
//!
//! # Responsibilities
//! - Filter records against a runtime-adjustable threshold
//! - Render one line per record: timestamp, level, tags, message, fields
//! - Forward the rendered line to a [`LogSink`]
//!
//! # Line Format
//! ```text
//! 2026/10/19 09:14:03.512 [INFO] [main:run] "Got signal" signal=SIGTERM
//! ```
//!
//! # Design Decisions
//! - Threshold lives in an `AtomicU8`: readers see the old or new level, never a mix
//! - Records below the threshold return before anything is formatted
//! - The logger holds no lock of its own; the sink serializes writes

use std::fmt::{self, Write as _};
use std::io::{self, Write as _};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use thiserror::Error;

/// Errors raised by log sinks.
#[derive(Debug, Error)]
pub enum LogError {
    /// The log file could not be created or opened for append.
    #[error("failed to open log file {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    /// Appending to the log file failed.
    #[error("failed to write log file {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// Rolling the log file over to a backup failed.
    #[error("failed to rotate log file {}: {source}", .path.display())]
    Rotate { path: PathBuf, source: io::Error },

    /// The sink was closed, explicitly or after an earlier fatal error.
    #[error("log file {} is closed", .0.display())]
    Closed(PathBuf),

    /// A rotating file needs a positive size limit.
    #[error("log file {} needs a maximum size greater than zero", .0.display())]
    InvalidLimit(PathBuf),
}

/// Destination for rendered log lines.
pub trait LogSink: Send + Sync {
    /// Write one complete record.
    fn write(&self, buf: &[u8]) -> Result<(), LogError>;

    /// Release the destination. Must be idempotent.
    fn close(&self) -> Result<(), LogError>;
}

/// Sink writing to standard output, used when no log directory is configured.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    closed: AtomicBool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogSink for ConsoleSink {
    fn write(&self, buf: &[u8]) -> Result<(), LogError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LogError::Closed(PathBuf::from("<stdout>")));
        }
        io::stdout()
            .lock()
            .write_all(buf)
            .map_err(|source| LogError::Write {
                path: PathBuf::from("<stdout>"),
                source,
            })
    }

    fn close(&self) -> Result<(), LogError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        io::stdout().flush().map_err(|source| LogError::Write {
            path: PathBuf::from("<stdout>"),
            source,
        })
    }
}

/// Record severity, totally ordered.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    /// Case-insensitive lookup that falls back to [`Level::Error`].
    pub fn from_name_lossy(name: &str) -> Self {
        name.parse().unwrap_or(Level::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl From<u8> for Level {
    fn from(val: u8) -> Self {
        match val {
            0 => Level::Debug,
            1 => Level::Info,
            2 => Level::Warn,
            _ => Level::Error,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`Level::from_str`] for names outside debug/info/warn/error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level {0:?}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Which parts of the line prefix are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFormat {
    pub timestamp: bool,
    pub level: bool,
    pub tags: bool,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self {
            timestamp: true,
            level: true,
            tags: true,
        }
    }
}

/// A structured key/value pair attached to a record.
pub type Field<'a> = (&'a str, &'a dyn fmt::Display);

/// A named, severity-filtered logger in front of a [`LogSink`].
pub struct LeveledLogger {
    name: &'static str,
    threshold: AtomicU8,
    format: LogFormat,
    sink: Box<dyn LogSink>,
}

impl LeveledLogger {
    /// Create a logger with the default format and an `Info` threshold.
    pub fn new(name: &'static str, sink: Box<dyn LogSink>) -> Self {
        Self::with_format(name, sink, LogFormat::default())
    }

    pub fn with_format(name: &'static str, sink: Box<dyn LogSink>, format: LogFormat) -> Self {
        Self {
            name,
            threshold: AtomicU8::new(Level::Info as u8),
            format,
            sink,
        }
    }

    /// Stream name ("system", "sql").
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn level(&self) -> Level {
        Level::from(self.threshold.load(Ordering::Acquire))
    }

    pub fn set_level(&self, level: Level) {
        self.threshold.store(level as u8, Ordering::Release);
    }

    /// Set the threshold from its textual name; unknown names select `Error`.
    pub fn set_level_name(&self, name: &str) -> Level {
        let level = Level::from_name_lossy(name);
        self.set_level(level);
        level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level as u8 >= self.threshold.load(Ordering::Acquire)
    }

    /// Render and write one record if `level` passes the threshold.
    pub fn log(
        &self,
        level: Level,
        module: &str,
        function: &str,
        message: &str,
        fields: &[Field<'_>],
    ) -> Result<(), LogError> {
        if !self.enabled(level) {
            return Ok(());
        }

        let line = self.render(level, module, function, message, fields);
        self.sink.write(line.as_bytes())?;
        metrics::counter!("log_records_written_total", "stream" => self.name).increment(1);
        Ok(())
    }

    pub fn debug(&self, module: &str, function: &str, message: &str, fields: &[Field<'_>]) {
        self.log_or_report(Level::Debug, module, function, message, fields);
    }

    pub fn info(&self, module: &str, function: &str, message: &str, fields: &[Field<'_>]) {
        self.log_or_report(Level::Info, module, function, message, fields);
    }

    pub fn warn(&self, module: &str, function: &str, message: &str, fields: &[Field<'_>]) {
        self.log_or_report(Level::Warn, module, function, message, fields);
    }

    pub fn error(&self, module: &str, function: &str, message: &str, fields: &[Field<'_>]) {
        self.log_or_report(Level::Error, module, function, message, fields);
    }

    /// Close the underlying sink. Safe to call more than once.
    pub fn close(&self) -> Result<(), LogError> {
        self.sink.close()
    }

    fn log_or_report(
        &self,
        level: Level,
        module: &str,
        function: &str,
        message: &str,
        fields: &[Field<'_>],
    ) {
        if let Err(e) = self.log(level, module, function, message, fields) {
            tracing::error!(stream = self.name, error = %e, "Dropped log record");
        }
    }

    fn render(
        &self,
        level: Level,
        module: &str,
        function: &str,
        message: &str,
        fields: &[Field<'_>],
    ) -> String {
        let mut line = String::with_capacity(64 + message.len());

        // Writing into a String cannot fail.
        if self.format.timestamp {
            let _ = write!(line, "{} ", chrono::Local::now().format("%Y/%m/%d %H:%M:%S%.3f"));
        }
        if self.format.level {
            let _ = write!(line, "[{}] ", level);
        }
        if self.format.tags {
            let _ = write!(line, "[{}:{}] ", module, function);
        }
        let _ = write!(line, "{:?}", message);
        for (key, value) in fields {
            let _ = write!(line, " {}={}", key, value);
        }
        line.push('\n');
        line
    }
}

impl fmt::Debug for LeveledLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeveledLogger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("format", &self.format)
            .finish()
    }
}
