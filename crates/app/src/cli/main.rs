//! Audio groups CLI

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use audiogroups_core::domain::settings::EngineSettings;
use audiogroups_core::domain::stream::Direction;

#[derive(Parser)]
#[command(name = "audiogroups")]
#[command(about = "Audio group rules compiler and stream classifier", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Settings file (TOML); defaults to the user configuration directory
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a configuration file and show the resulting groups and streams
    Check {
        /// Configuration file; defaults to the one named in the settings
        config: Option<PathBuf>,

        /// Print the model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile a single match rule and print its normalized form
    Rule {
        /// Rule text, e.g. "(property media.role=music AND direction output)"
        text: String,
    },

    /// Classify a described stream against a configuration
    Classify {
        config: Option<PathBuf>,

        #[arg(short, long)]
        direction: Direction,

        /// Stream property, repeatable
        #[arg(short, long = "property", value_name = "KEY=VALUE", value_parser = commands::parse_property)]
        properties: Vec<(String, String)>,

        /// The stream already has its own volume control
        #[arg(long)]
        explicit_volume: bool,

        /// The stream already has its own mute control
        #[arg(long)]
        explicit_mute: bool,
    },

    /// Load a configuration and reload it whenever the file changes
    Watch {
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => EngineSettings::load_from_file(path).await?,
        None => EngineSettings::load_or_default().await,
    };

    let default_filter = if cli.verbose { "debug" } else { settings.log_filter.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(?settings, "Audio groups starting");

    match cli.command {
        Command::Check { config, json } => commands::check(&settings, config, json).await,
        Command::Rule { text } => commands::rule(&text),
        Command::Classify {
            config,
            direction,
            properties,
            explicit_volume,
            explicit_mute,
        } => {
            let request = commands::ClassifyRequest {
                direction,
                properties,
                explicit_volume,
                explicit_mute,
            };
            commands::classify(&settings, config, request).await
        }
        Command::Watch { config } => commands::watch(&settings, config).await,
    }
}
