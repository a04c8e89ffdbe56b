//! Command-line interface definition for streamchat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot sends and
//! configuration inspection.

use clap::{Parser, Subcommand};

/// streamchat - terminal chat widget for streaming answer endpoints
///
/// Sends each message to a configured HTTP endpoint and renders the
/// answer as it streams back.
#[derive(Parser, Debug, Clone)]
#[command(name = "streamchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Override the answer endpoint URL
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Override the request timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for streamchat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Print your own messages back into the transcript
        #[arg(long)]
        echo: bool,
    },

    /// Send a single message and stream the answer to stdout
    Send {
        /// Message to send
        message: String,
    },

    /// Print the effective configuration as YAML
    Config,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            endpoint: None,
            timeout_ms: None,
            command: Commands::Config,
        }
    }
}
