//! shardgate entry point.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI args ──▶ lifecycle::Orchestrator
//!                   │
//!                   ├─▶ config      (TOML → ProxyConfig, hot-reloaded log level)
//!                   ├─▶ observability
//!                   │     ├─ sys.log  (LeveledLogger → RotatingFileWriter)
//!                   │     └─ sql.log  (LeveledLogger → RotatingFileWriter)
//!                   ├─▶ server      (Service: build / run / close)
//!                   └─▶ signals     (SIGHUP/SIGINT/SIGTERM/SIGQUIT → shutdown)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shardgate::lifecycle::{LaunchOptions, Orchestrator};
use shardgate::Server;

#[derive(Parser)]
#[command(name = "shardgate")]
#[command(about = "Proxy service bootstrap with rotating logs", long_about = None)]
struct Cli {
    /// Config file
    #[arg(short, long, default_value = "/etc/shardgate.toml")]
    config: PathBuf,

    /// Log level [debug|info|warn|error], overrides the config file
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shardgate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut orchestrator = Orchestrator::new(LaunchOptions {
        config_path: Some(cli.config),
        level_override: cli.log_level,
    });

    match orchestrator.run::<Server>().await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
