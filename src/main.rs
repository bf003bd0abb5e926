//! Mediator command-line entry point.
//!
//! `analyze` runs one-off analyses, `status` reports which strategy is active,
//! `serve` exposes the engine over HTTP.

use std::io::Read;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediator::config::MediatorConfig;
use mediator::error::{MediatorError, Result};
use mediator::pipeline::AnalysisOrchestrator;
use mediator::web::{self, AppState};

#[derive(Parser)]
#[command(name = "mediator")]
#[command(about = "Analyze and neutralize co-parenting messages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a message and print the result as JSON
    Analyze {
        /// Message text; read from stdin when omitted
        text: Vec<String>,
    },

    /// Show which analysis strategy is active
    Status,

    /// Serve the HTTP API
    Serve {
        /// Listen port (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // RUST_LOG overrides the default `info` level, e.g. RUST_LOG=mediator=debug
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = MediatorConfig::from_env()?;
    let orchestrator = Arc::new(AnalysisOrchestrator::from_config(&config)?);

    match cli.command {
        Commands::Analyze { text } => {
            let text = if text.is_empty() {
                read_stdin()?
            } else {
                text.join(" ")
            };

            if text.trim().is_empty() {
                return Err(MediatorError::Config("nothing to analyze".to_string()));
            }

            let result = orchestrator.analyze(&text).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Status => {
            println!("{}", orchestrator.status_message());
            println!(
                "mediator {} (commit {}, built {})",
                env!("CARGO_PKG_VERSION"),
                env!("GIT_COMMIT"),
                env!("BUILD_TIMESTAMP")
            );
            if !config.extra_rules.is_empty() {
                println!("extra rules: {}", config.extra_rules.len());
            }
        }
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.port);
            tracing::info!(
                port,
                remote = orchestrator.is_remote_available(),
                "Mediator starting"
            );
            web::serve(AppState::new(orchestrator), port).await?;
        }
    }

    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| MediatorError::Config(format!("Failed to read stdin: {}", e)))?;
    Ok(buffer)
}
