//! Ordered, one-shot shutdown.
//!
//! # Sequence
//! ```text
//! trigger (signal / server stopped)
//!     → log the trigger to the system stream
//!     → close system logger
//!     → close sql logger
//!     → close server (its run loop returns)
//!     → cancel the process-wide token
//! ```
//!
//! # Design Decisions
//! - An atomic flag guarantees the sequence runs at most once
//! - Every close is also idempotent, so a late second trigger is harmless
//! - Callers that lose the race can await `finished()`

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::lifecycle::signals::TerminationSignal;
use crate::lifecycle::Service;
use crate::observability::LoggerRegistry;

/// Why shutdown began.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// An OS termination signal arrived.
    Signal(TerminationSignal),
    /// The server's run loop returned by itself.
    ServerStopped,
    /// The server's run loop returned an error.
    ServerFailed(String),
    /// Startup could not complete after the server was built.
    StartupAborted(String),
}

impl ShutdownTrigger {
    fn label(&self) -> &'static str {
        match self {
            ShutdownTrigger::Signal(_) => "signal",
            ShutdownTrigger::ServerStopped => "server_stopped",
            ShutdownTrigger::ServerFailed(_) => "server_failed",
            ShutdownTrigger::StartupAborted(_) => "startup_aborted",
        }
    }
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownTrigger::Signal(sig) => write!(f, "signal {}", sig),
            ShutdownTrigger::ServerStopped => f.write_str("server stopped"),
            ShutdownTrigger::ServerFailed(e) => write!(f, "server failed: {}", e),
            ShutdownTrigger::StartupAborted(e) => write!(f, "startup aborted: {}", e),
        }
    }
}

/// Closes the loggers and the server exactly once, in a fixed order.
pub struct ShutdownSequence<S: Service> {
    loggers: Arc<LoggerRegistry>,
    server: Arc<S>,
    token: CancellationToken,
    started: AtomicBool,
    finished: CancellationToken,
}

impl<S: Service> ShutdownSequence<S> {
    /// `token` is the process-wide shutdown token; it is cancelled last.
    pub fn new(loggers: Arc<LoggerRegistry>, server: Arc<S>, token: CancellationToken) -> Self {
        Self {
            loggers,
            server,
            token,
            started: AtomicBool::new(false),
            finished: CancellationToken::new(),
        }
    }

    /// Run the sequence. Returns `false` if it had already been started.
    pub fn execute(&self, trigger: ShutdownTrigger) -> bool {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::debug!(trigger = %trigger, "Shutdown already in progress");
            return false;
        }

        tracing::info!(trigger = %trigger, "Shutting down");
        metrics::counter!("shutdown_total", "trigger" => trigger.label()).increment(1);

        let system = self.loggers.system();
        match &trigger {
            ShutdownTrigger::Signal(sig) => {
                system.info("main", "main", "Got signal", &[("signal", sig)]);
            }
            ShutdownTrigger::ServerStopped => {
                system.info("main", "main", "Server stopped", &[]);
            }
            ShutdownTrigger::ServerFailed(e) => {
                system.error("main", "main", "Server failed", &[("error", e)]);
            }
            ShutdownTrigger::StartupAborted(e) => {
                system.error("main", "main", "Startup aborted", &[("error", e)]);
            }
        }

        if let Err(e) = system.close() {
            tracing::warn!(error = %e, "Closing system log failed");
        }
        if let Err(e) = self.loggers.sql().close() {
            tracing::warn!(error = %e, "Closing sql log failed");
        }
        self.server.close();
        self.token.cancel();

        self.finished.cancel();
        true
    }

    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Resolves once a started sequence has run to completion.
    pub async fn finished(&self) {
        self.finished.cancelled().await
    }
}
