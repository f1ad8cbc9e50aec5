//! Labeler CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Write a default config
//! - `status`  — Show configuration and stored state
//! - `label`   — Interactive labeling session
//! - `export`  — Write the per-user or global report
//! - `stats`   — Summarize stored results
//! - `serve`   — Run the shared state server

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod runtime;

use commands::export::{Format, Scope};

#[derive(Parser)]
#[command(
    name = "labeler",
    about = "Labeler — collaborative domain classification",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config directory and a default config file
    Onboard,

    /// Show configuration and stored state
    Status,

    /// Start an interactive labeling session
    Label {
        /// Log in as this identity right away
        #[arg(short, long)]
        user: Option<String>,

        /// Keep results in memory only
        #[arg(long)]
        ephemeral: bool,
    },

    /// Export stored results
    Export {
        /// Which report to produce
        #[arg(long, value_enum, default_value_t = Scope::Users)]
        scope: Scope,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize stored results
    Stats,

    /// Run the state server used by the `http` persistence backend
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Label { user, ephemeral } => commands::label::run(user, ephemeral).await?,
        Commands::Export {
            scope,
            format,
            output,
        } => commands::export::run(scope, format, output).await?,
        Commands::Stats => commands::stats::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
    }

    Ok(())
}
