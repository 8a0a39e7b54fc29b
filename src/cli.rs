// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gemini-key-rotator",
    version,
    about = "Gemini API client with credential-pool failover",
    long_about = "Calls the Gemini generateContent API through a pool of API keys. Keys that hit their quota are put on cooldown and the request is retried with the next key."
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "GEMINI_ROTATOR_JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Serve the generateContent passthrough and admin routes over HTTP
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one prompt through the key pool and print the reply
    Generate {
        /// Target model, e.g. gemini-1.5-flash
        #[arg(short, long, default_value = "gemini-1.5-flash")]
        model: String,

        /// Prompt text
        #[arg(short, long)]
        prompt: String,

        /// Print the raw JSON response instead of the extracted text
        #[arg(long)]
        raw: bool,
    },

    /// Print the configured key pool (masked)
    Stats,

    /// Validate the configuration and exit
    CheckConfig,

    /// Write a default configuration file
    InitConfig {
        /// Output file path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
