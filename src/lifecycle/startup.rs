//! Startup orchestration.
//!
//! # Phases
//! ```text
//! Initializing → LoggingReady → ServerReady → Running → ShuttingDown → Stopped
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, nothing is retried
//! - Loggers exist before the server, so server failures are logged
//! - The signal watcher triggers shutdown; the caller blocks on `run`

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::watcher::{apply_level_updates, ConfigWatcher};
use crate::config::{load_config, ConfigError, ProxyConfig};
use crate::lifecycle::shutdown::{ShutdownSequence, ShutdownTrigger};
use crate::lifecycle::signals::{TerminationSignal, TerminationSignals};
use crate::lifecycle::Service;
use crate::observability::metrics::{self, MetricsError};
use crate::observability::{LogError, LoggerRegistry};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const BANNER: &str = r"
           __                   __            __
     _____/ /_  ____ __________/ /___ _____ _/ /____
    / ___/ __ \/ __ `/ ___/ __  / __ `/ __ `/ __/ _ \
   (__  ) / / / /_/ / /  / /_/ / /_/ / /_/ / /_/  __/
  /____/_/ /_/\__,_/_/   \__,_/\__, /\__,_/\__/\___/
                              /____/
";

/// Fatal lifecycle errors. Each one ends the process.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("must use a config file")]
    MissingConfig,

    #[error("parse config file error: {0}")]
    Config(#[from] ConfigError),

    #[error("new log file error: {0}")]
    LogOpen(#[from] LogError),

    #[error("{0}")]
    Metrics(#[source] MetricsError),

    #[error("server construction failed: {0}")]
    ServerBuild(#[source] BoxError),

    #[error("failed to register termination signals: {0}")]
    Signal(#[source] io::Error),

    #[error("server failed: {0}")]
    ServerRun(#[source] BoxError),
}

/// Where the lifecycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    LoggingReady,
    ServerReady,
    Running,
    ShuttingDown,
    Stopped,
}

/// Command-line inputs to the lifecycle.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Config file to load and watch.
    pub config_path: Option<PathBuf>,
    /// Log level that beats the configured one and survives reloads.
    pub level_override: Option<String>,
}

/// Drives the process from configuration to exit.
#[derive(Debug)]
pub struct Orchestrator {
    options: LaunchOptions,
    phase: Phase,
}

impl Orchestrator {
    pub fn new(options: LaunchOptions) -> Self {
        Self {
            options,
            phase: Phase::Initializing,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Full bootstrap: config, loggers, then [`Orchestrator::launch`].
    pub async fn run<S: Service>(&mut self) -> Result<(), StartupError> {
        print!("{}", BANNER);

        let path = self
            .options
            .config_path
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(StartupError::MissingConfig)?;
        println!("config file: {}", path.display());

        let config = load_config(&path)?;

        let loggers = match &config.log_path {
            Some(dir) => {
                println!("log dir path: {}", dir.display());
                LoggerRegistry::open(dir, &config.log_rotation)?
            }
            None => LoggerRegistry::console(),
        };

        self.launch::<S, _, _>(config, loggers, || {
            let mut signals = TerminationSignals::register()?;
            Ok(async move { signals.recv().await })
        })
        .await
    }

    /// Everything after the loggers exist.
    ///
    /// `register` installs the termination source; the future it returns
    /// resolves when the process is asked to stop.
    pub async fn launch<S, R, F>(
        &mut self,
        config: ProxyConfig,
        loggers: LoggerRegistry,
        register: R,
    ) -> Result<(), StartupError>
    where
        S: Service,
        R: FnOnce() -> io::Result<F>,
        F: Future<Output = Option<TerminationSignal>> + Send + 'static,
    {
        let loggers = Arc::new(loggers);
        self.advance(Phase::LoggingReady);

        let level_name = self
            .options
            .level_override
            .as_deref()
            .unwrap_or(&config.log_level);
        let level = loggers.system().set_level_name(level_name);
        tracing::info!(level = %level, "System log level set");

        if config.observability.metrics_enabled {
            if let Err(e) = metrics::init_metrics(&config.observability.metrics_address) {
                self.abort(&loggers, &e.to_string());
                return Err(StartupError::Metrics(e));
            }
        }

        let token = CancellationToken::new();
        let server = match S::build(&config, loggers.clone(), token.clone()).await {
            Ok(server) => Arc::new(server),
            Err(e) => {
                self.abort(&loggers, &e.to_string());
                return Err(StartupError::ServerBuild(Box::new(e)));
            }
        };
        self.advance(Phase::ServerReady);

        let sequence = Arc::new(ShutdownSequence::new(
            loggers.clone(),
            server.clone(),
            token.clone(),
        ));

        let termination = match register() {
            Ok(termination) => termination,
            Err(e) => {
                sequence.execute(ShutdownTrigger::StartupAborted(e.to_string()));
                self.advance(Phase::Stopped);
                return Err(StartupError::Signal(e));
            }
        };

        let watcher_task = {
            let sequence = sequence.clone();
            tokio::spawn(async move {
                match termination.await {
                    Some(signal) => {
                        sequence.execute(ShutdownTrigger::Signal(signal));
                    }
                    None => tracing::warn!("Termination signal source closed"),
                }
            })
        };

        // Held for the lifetime of the run loop.
        let _config_watch = self.spawn_config_reload(&loggers, &token);

        self.advance(Phase::Running);
        let result = server.run().await;

        self.advance(Phase::ShuttingDown);
        let trigger = match &result {
            Ok(()) => ShutdownTrigger::ServerStopped,
            Err(e) => ShutdownTrigger::ServerFailed(e.to_string()),
        };
        if !sequence.execute(trigger) {
            sequence.finished().await;
        }
        watcher_task.abort();
        self.advance(Phase::Stopped);

        result.map_err(|e| StartupError::ServerRun(Box::new(e)))
    }

    fn spawn_config_reload(
        &self,
        loggers: &Arc<LoggerRegistry>,
        token: &CancellationToken,
    ) -> Option<notify::RecommendedWatcher> {
        let path: &Path = self.options.config_path.as_deref()?;
        let (watcher, updates) = ConfigWatcher::new(path);
        match watcher.run() {
            Ok(handle) => {
                tokio::spawn(apply_level_updates(
                    updates,
                    loggers.clone(),
                    self.options.level_override.is_some(),
                    token.clone(),
                ));
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Config hot reload disabled");
                None
            }
        }
    }

    /// Log a startup failure to the system stream, then close system and sql.
    fn abort(&mut self, loggers: &LoggerRegistry, message: &str) {
        loggers.system().error("main", "main", message, &[]);
        if let Err(close) = loggers.close() {
            tracing::warn!(error = %close, "Closing logs failed");
        }
        self.advance(Phase::Stopped);
    }

    fn advance(&mut self, next: Phase) {
        tracing::debug!(from = ?self.phase, to = ?next, "Lifecycle phase change");
        self.phase = next;
    }
}
