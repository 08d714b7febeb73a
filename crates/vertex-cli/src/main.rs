//! # vertex CLI
//!
//! Command-line bootstrap for a vertex node or simulated network.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// vertex - hierarchical actor state machines over a bilateral payment network
#[derive(Parser, Debug)]
#[command(name = "vertex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a network from a bootstrap config file
    Run {
        /// Path to a YAML or JSON bootstrap config (spec.md §6 shape)
        #[arg(short, long, default_value = "vertex.yaml")]
        config: PathBuf,

        /// Maximum transactions sealed per produced block
        #[arg(long, default_value_t = 64)]
        max_transactions: usize,

        /// Per-signer mempool capacity
        #[arg(long, default_value_t = 1024)]
        mempool_capacity: usize,
    },

    /// Validate a bootstrap config file without starting a network
    Check {
        /// Path to a YAML or JSON bootstrap config
        #[arg(short, long, default_value = "vertex.yaml")]
        config: PathBuf,
    },

    /// Manage signer identities
    Identity {
        #[command(subcommand)]
        command: IdentityCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
enum IdentityCommands {
    /// Generate a new secp256k1 keypair
    Generate {
        /// Write the hex-encoded secret key to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the public key derived from a secret-key file
    Show {
        /// Path to a hex-encoded secret key, as written by `identity generate`
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vertex={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run {
            config,
            max_transactions,
            mempool_capacity,
        } => {
            commands::run(&config, max_transactions, mempool_capacity).await?;
        }
        Commands::Check { config } => {
            commands::check(&config)?;
        }
        Commands::Identity { command } => match command {
            IdentityCommands::Generate { output } => {
                commands::identity_generate(output.as_deref())?;
            }
            IdentityCommands::Show { path } => {
                commands::identity_show(&path)?;
            }
        },
        Commands::Version => {
            println!("vertex {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
