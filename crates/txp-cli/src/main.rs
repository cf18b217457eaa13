//! txproc CLI
//!
//! Submits events to a txProc server and inspects protocol frames:
//! - `submit`: build an event from flags and send it
//! - `encode` / `decode`: write and read frame files
//! - `config`: manage the client configuration file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use txp_core::config::{self, ClientConfig};
use txproc::commands::{self, DestinationArgs, EventArgs};

#[derive(Parser)]
#[command(name = "txproc")]
#[command(author, version, about = "Client for the txProc event processor")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an event to a txProc server
    Submit {
        #[command(flatten)]
        event: EventArgs,
        #[command(flatten)]
        destination: DestinationArgs,
        /// Read the reply when the server announces one
        #[arg(short, long)]
        wait: bool,
        /// Print a reply as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encode an event into a protocol frame
    Encode {
        #[command(flatten)]
        event: EventArgs,
        /// Output file (raw frame to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a protocol frame and show its sections
    Decode {
        /// Frame file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
        /// Print the sections as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Show config file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn load_client_config(config_path: Option<&PathBuf>) -> Result<ClientConfig> {
    let path = commands::resolve_config_path(config_path);
    config::load_config_or_default(&path)
        .with_context(|| format!("Failed to load config from {:?}", path))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Submit {
            event,
            destination,
            wait,
            json,
        } => {
            let mut config = load_client_config(cli.config.as_ref())?;
            config.verbose |= cli.verbose > 0;
            commands::submit_command(config, &event, &destination, wait, json)?;
        }

        Commands::Encode { event, output } => {
            commands::encode_command(&event, output.as_deref())?;
        }

        Commands::Decode { input, json } => {
            commands::decode_command(&input, json)?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                commands::config_show(cli.config.as_ref())?;
            }
            ConfigAction::Path => {
                let path = commands::resolve_config_path(cli.config.as_ref());
                println!("{}", path.display());
            }
            ConfigAction::Init { force } => {
                commands::config_init(cli.config.as_ref(), force)?;
            }
        },
    }

    Ok(())
}
