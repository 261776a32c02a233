// Avatalk
// Main entry point for the avatalk binary

use clap::Parser;
use avatalk_engine::cli::{Cli, Command};
use avatalk_engine::config::Config;
use avatalk_engine::handlers::{
    handle_ask, handle_chat, handle_doctor, handle_models, handle_setup, OutputFormat,
};
use avatalk_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Secrets may live in a local .env file
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let mut config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    if let Some(level) = &cli.log {
        config.core.log_level = level.clone();
    }

    // RUST_LOG still wins over the config-driven level
    init_telemetry_with_level(&config.core.log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");
    tracing::info!("Avatalk v{} ({} - {})", version, commit, timestamp);
    if dotenv_loaded {
        tracing::debug!("Loaded environment from .env");
    }

    // Handle commands
    match cli.command {
        Command::Chat { turn } => {
            tracing::info!("Starting interactive chat");
            handle_chat(&turn, &config, format).await
        }

        Command::Ask { message, turn } => {
            tracing::info!("One-shot turn");
            handle_ask(message, &turn, &config, format).await
        }

        Command::Models => handle_models(&config, format).await,

        Command::Setup => {
            tracing::info!("Running setup...");
            handle_setup().await
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    }
}
