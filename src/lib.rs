//! shardgate: bootstrap of a long-running proxy service.
//!
//! Rotating system/sql logs plus an ordered, signal-driven lifecycle
//! around a pluggable server.

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod server;

pub use config::ProxyConfig;
pub use lifecycle::{Orchestrator, Service, ShutdownSequence};
pub use observability::{LeveledLogger, LoggerRegistry, RotatingFileWriter};
pub use server::Server;
