//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Call sites (server, lifecycle):
//!     → registry.rs (system / sql LeveledLogger)
//!     → logging.rs (threshold check, line rendering)
//!     → rotating.rs (size-bounded file with numbered backups)
//!
//! Process diagnostics:
//!     → tracing subscriber (stderr)
//!     → metrics.rs (counters, optional Prometheus endpoint)
//! ```
//!
//! # Design Decisions
//! - Loggers are injected through `Arc<LoggerRegistry>`, never global
//! - The rotating file is the only lock on the logging path
//! - Each stream rotates independently

pub mod logging;
pub mod metrics;
pub mod registry;
pub mod rotating;

pub use logging::{ConsoleSink, Field, Level, LeveledLogger, LogError, LogFormat, LogSink};
pub use registry::LoggerRegistry;
pub use rotating::RotatingFileWriter;
