//! streamchat - terminal chat widget for streaming answer endpoints
//!
#![doc = "streamchat - terminal chat widget for streaming answer endpoints"]
#![doc = "Main entry point for the streamchat CLI."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use streamchat::cli::{Cli, Commands};
use streamchat::commands;
use streamchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse first so --verbose can pick the log level
    let cli = Cli::parse_args();

    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { echo } => {
            if echo {
                tracing::debug!("Echoing outgoing messages");
            }
            commands::chat::run_chat(config, echo).await?;
            Ok(())
        }
        Commands::Send { message } => {
            tracing::info!("Sending one message to {}", config.endpoint.url);
            commands::send::run_send(config, message).await?;
            Ok(())
        }
        Commands::Config => {
            commands::show_config::run_show_config(&config)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr; stdout carries the chat transcript.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "streamchat=debug"
    } else {
        "streamchat=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .init();
}
