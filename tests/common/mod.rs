//! Shared utilities for lifecycle integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use shardgate::config::ProxyConfig;
use shardgate::lifecycle::Service;
use shardgate::observability::{LeveledLogger, LogError, LogFormat, LogSink, LoggerRegistry};

/// Ordered record of everything the sinks and servers observed.
pub type Events = Arc<Mutex<Vec<String>>>;

tokio::task_local! {
    /// Lets `Service::build`, which has no `self`, find the test's event log.
    pub static EVENTS: Events;
}

pub fn snapshot(events: &Events) -> Vec<String> {
    events.lock().unwrap().clone()
}

/// Sink that appends "<name> write <line>" and "<name> close" to `events`.
pub struct RecordingSink {
    name: &'static str,
    events: Events,
}

impl LogSink for RecordingSink {
    fn write(&self, buf: &[u8]) -> Result<(), LogError> {
        let line = String::from_utf8_lossy(buf);
        self.events
            .lock()
            .unwrap()
            .push(format!("{} write {}", self.name, line.trim_end()));
        Ok(())
    }

    fn close(&self) -> Result<(), LogError> {
        self.events.lock().unwrap().push(format!("{} close", self.name));
        Ok(())
    }
}

/// System and sql loggers without timestamps, recording into `events`.
pub fn recording_registry(events: &Events) -> LoggerRegistry {
    let format = LogFormat {
        timestamp: false,
        ..LogFormat::default()
    };
    let logger = |name| {
        LeveledLogger::with_format(
            name,
            Box::new(RecordingSink {
                name,
                events: events.clone(),
            }),
            format,
        )
    };
    LoggerRegistry::new(logger("system"), logger("sql"))
}

/// Logs once at info level, then serves until closed.
pub struct TestServer {
    loggers: Arc<LoggerRegistry>,
    stop: CancellationToken,
    events: Events,
}

impl Service for TestServer {
    type Error = io::Error;

    async fn build(
        _config: &ProxyConfig,
        loggers: Arc<LoggerRegistry>,
        shutdown: CancellationToken,
    ) -> io::Result<Self> {
        Ok(Self {
            loggers,
            stop: shutdown.child_token(),
            events: EVENTS.with(|events| events.clone()),
        })
    }

    async fn run(&self) -> io::Result<()> {
        self.loggers.system().info("test", "run", "running", &[]);
        self.stop.cancelled().await;
        Ok(())
    }

    fn close(&self) {
        self.events.lock().unwrap().push("server close".to_string());
        self.stop.cancel();
    }
}

/// Fails during construction.
pub struct FailingServer;

impl Service for FailingServer {
    type Error = io::Error;

    async fn build(
        _config: &ProxyConfig,
        _loggers: Arc<LoggerRegistry>,
        _shutdown: CancellationToken,
    ) -> io::Result<Self> {
        Err(io::Error::new(io::ErrorKind::AddrInUse, "address in use"))
    }

    async fn run(&self) -> io::Result<()> {
        Ok(())
    }

    fn close(&self) {}
}

/// Builds, then fails as soon as it runs.
pub struct BrokenServer {
    events: Events,
}

impl Service for BrokenServer {
    type Error = io::Error;

    async fn build(
        _config: &ProxyConfig,
        _loggers: Arc<LoggerRegistry>,
        _shutdown: CancellationToken,
    ) -> io::Result<Self> {
        Ok(Self {
            events: EVENTS.with(|events| events.clone()),
        })
    }

    async fn run(&self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "listener lost"))
    }

    fn close(&self) {
        self.events.lock().unwrap().push("server close".to_string());
    }
}
