//! Metrics collection and exposition.
//!
//! # Metrics
//! - `log_records_written_total` (counter): records written, by stream
//! - `log_rotations_total` (counter): log file rotations, by file
//! - `server_connections_total` (counter): connections accepted by the server
//! - `shutdown_total` (counter): shutdown sequences run, by trigger
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Exporter is optional and bound to its own address

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid metrics address {0:?}")]
    Address(String),

    #[error("failed to start metrics exporter: {0}")]
    Exporter(#[from] BuildError),
}

/// Install the Prometheus recorder and serve it on `address`.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(address: &str) -> Result<(), MetricsError> {
    let addr: SocketAddr = address
        .parse()
        .map_err(|_| MetricsError::Address(address.to_string()))?;
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}
