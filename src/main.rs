//! # kubeseal-backuper CLI
//!
//! ```bash
//! # Back up the key, demote stale keys, restart the controller (default)
//! kubeseal-backuper rotate
//!
//! # Back up and notify only
//! kubeseal-backuper backup
//!
//! # Write the sanitized key locally
//! kubeseal-backuper export --output key.yaml
//! kubeseal-backuper export --output -
//! ```
//!
//! Configuration comes from the environment (or a `.env` file).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::error;

use kubeseal_backuper::config::RunMode;
use kubeseal_backuper::runtime::{initialize, run_export, run_rotation, EXIT_FAILURE};

#[derive(Parser)]
#[command(name = "kubeseal-backuper")]
#[command(about = "Back up and rotate the sealed-secrets controller key", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up the active key, demote stale keys and restart the controller
    Rotate,
    /// Back up the active key and notify; the cluster is not modified
    Backup,
    /// Write the sanitized active key to a local file
    Export {
        /// Output file, `-` for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = initialize() {
        eprintln!("{e:#}");
        process::exit(i32::from(EXIT_FAILURE));
    }

    let result = match cli.command.unwrap_or(Commands::Rotate) {
        Commands::Rotate => run_rotation(RunMode::Rotate).await,
        Commands::Backup => run_rotation(RunMode::Backup).await,
        Commands::Export { output } => run_export(&output).await,
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            EXIT_FAILURE
        }
    };
    // Exit without waiting on a blocking write abandoned at the deadline
    process::exit(i32::from(code));
}
