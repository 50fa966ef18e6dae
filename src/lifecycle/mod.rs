//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Open loggers → Set level → Build server → Register signals → Run
//!
//! Signals (signals.rs):
//!     SIGHUP/SIGINT/SIGTERM/SIGQUIT → begin shutdown
//!
//! Shutdown (shutdown.rs):
//!     Log trigger → Close system log → Close sql log → Close server
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then loggers, then the server
//! - Ordered shutdown, guarded so it runs once however many signals arrive
//! - The server is reached only through the `Service` trait

pub mod service;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use service::Service;
pub use shutdown::{ShutdownSequence, ShutdownTrigger};
pub use signals::{TerminationSignal, TerminationSignals};
pub use startup::{LaunchOptions, Orchestrator, Phase, StartupError};
