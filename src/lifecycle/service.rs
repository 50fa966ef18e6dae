//! The contract between the lifecycle and the server it starts.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ProxyConfig;
use crate::observability::LoggerRegistry;

/// A long-running server driven by the lifecycle.
pub trait Service: Send + Sync + Sized + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Construct the server. `shutdown` fires when the process is stopping;
    /// internal loops should observe it.
    fn build(
        config: &ProxyConfig,
        loggers: Arc<LoggerRegistry>,
        shutdown: CancellationToken,
    ) -> impl Future<Output = Result<Self, Self::Error>> + Send;

    /// Serve until closed.
    fn run(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Make `run` return. Must be idempotent.
    fn close(&self);
}
