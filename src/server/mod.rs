//! Stand-in server driven by the lifecycle.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (ID assignment, live count)
//!     → drained until the peer hangs up or shutdown fires
//! ```
//!
//! # Design Decisions
//! - No protocol is spoken; connections are accepted, logged and released
//! - `close` cancels a token that every loop observes
//! - Closing waits a bounded time for connections to drain

pub mod connection;
pub mod listener;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::config::ProxyConfig;
use crate::lifecycle::Service;
use crate::observability::LoggerRegistry;
use connection::{ConnectionGuard, ConnectionTracker};
use listener::{Listener, ListenerError};

/// How long `run` waits for open connections after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

pub struct Server {
    listener: Listener,
    loggers: Arc<LoggerRegistry>,
    tracker: ConnectionTracker,
    shutdown: CancellationToken,
}

impl Server {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }
}

impl Service for Server {
    type Error = ServerError;

    async fn build(
        config: &ProxyConfig,
        loggers: Arc<LoggerRegistry>,
        shutdown: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = Listener::bind(&config.listener).await?;
        Ok(Self {
            listener,
            loggers,
            tracker: ConnectionTracker::new(),
            shutdown: shutdown.child_token(),
        })
    }

    async fn run(&self) -> Result<(), ServerError> {
        let addr = self.listener.local_addr().map_err(ListenerError::Accept)?;
        self.loggers
            .system()
            .info("server", "run", "Server started", &[("address", &addr)]);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let guard = self.tracker.track();
                        metrics::counter!("server_connections_total").increment(1);
                        self.loggers.system().debug(
                            "server",
                            "accept",
                            "Client connected",
                            &[
                                ("conn_id", &guard.id()),
                                ("peer", &peer),
                                ("free_slots", &self.listener.available_permits()),
                            ],
                        );

                        let loggers = self.loggers.clone();
                        let shutdown = self.shutdown.clone();
                        tokio::spawn(async move {
                            let _permit = permit;
                            serve_connection(stream, guard, loggers, shutdown).await;
                        });
                    }
                    Err(ListenerError::Closed) => break,
                    Err(e) => {
                        // Accept errors (e.g. fd exhaustion) are per-connection.
                        tracing::warn!(error = %e, "Accept failed");
                    }
                },
            }
        }

        if tokio::time::timeout(DRAIN_TIMEOUT, self.tracker.wait_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Connections still open after drain timeout"
            );
        }
        tracing::info!("Server stopped");
        Ok(())
    }

    fn close(&self) {
        self.shutdown.cancel();
    }
}

/// Discard client bytes until the peer hangs up or shutdown fires.
async fn serve_connection(
    mut stream: TcpStream,
    guard: ConnectionGuard,
    loggers: Arc<LoggerRegistry>,
    shutdown: CancellationToken,
) {
    let mut buf = [0u8; 4096];
    let mut received: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            read = stream.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => received += n as u64,
                Err(e) => {
                    tracing::debug!(conn_id = %guard.id(), error = %e, "Read failed");
                    break;
                }
            },
        }
    }

    loggers.system().debug(
        "server",
        "serve_connection",
        "Client disconnected",
        &[("conn_id", &guard.id()), ("bytes", &received)],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::LeveledLogger;
    use crate::observability::logging::tests::MemorySink;
    use tokio::io::AsyncWriteExt;

    fn loggers() -> (Arc<LoggerRegistry>, MemorySink) {
        let sink = MemorySink::default();
        let registry = LoggerRegistry::new(
            LeveledLogger::new("system", Box::new(sink.clone())),
            LeveledLogger::new("sql", Box::new(MemorySink::default())),
        );
        registry.system().set_level(crate::observability::Level::Debug);
        (Arc::new(registry), sink)
    }

    fn local_config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config
    }

    #[tokio::test]
    async fn build_fails_on_bad_address() {
        let mut config = local_config();
        config.listener.bind_address = "bogus".into();
        let (loggers, _) = loggers();

        let result = Server::build(&config, loggers, CancellationToken::new()).await;
        assert!(matches!(result, Err(ServerError::Listener(ListenerError::Bind { .. }))));
    }

    #[tokio::test]
    async fn close_makes_run_return() {
        let (loggers, sink) = loggers();
        let server = Arc::new(
            Server::build(&local_config(), loggers, CancellationToken::new())
                .await
                .unwrap(),
        );
        let addr = server.local_addr().unwrap();

        let runner = {
            let server = server.clone();
            tokio::spawn(async move { server.run().await })
        };

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"hello").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(server.active_connections(), 1);

        server.close();
        server.close();
        tokio::time::timeout(Duration::from_secs(2), runner)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let lines = sink.lines.lock().unwrap();
        assert!(lines
            .iter()
            .any(|l| l.contains("\"Client connected\"") && l.contains("free_slots=9999")));
        assert!(lines.iter().any(|l| l.contains("\"Client disconnected\"")));
    }

    #[tokio::test]
    async fn parent_token_cancels_server() {
        let (loggers, _) = loggers();
        let parent = CancellationToken::new();
        let server = Server::build(&local_config(), loggers, parent.clone())
            .await
            .unwrap();

        parent.cancel();
        tokio::time::timeout(Duration::from_secs(2), server.run())
            .await
            .unwrap()
            .unwrap();
    }
}
