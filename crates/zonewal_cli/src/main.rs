//! zonewal CLI
//!
//! Command-line tools for zone pools on a zonefs mount.
//!
//! # Commands
//!
//! - `inspect` - List the zones under a mount and their sizes
//! - `reset` - Reset one zone by its hex id
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// zonewal zone pool tools.
#[derive(Parser)]
#[command(name = "zonewal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the zone files
    #[arg(global = true, short, long)]
    mount: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the zones under the mount
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Reset one zone, discarding its contents
    Reset {
        /// Zone id in hex, as in the zone file name
        zone: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let mount = cli.mount.ok_or("Mount path required for inspect")?;
            commands::inspect::run(&mount, &format)?;
        }
        Commands::Reset { zone } => {
            let mount = cli.mount.ok_or("Mount path required for reset")?;
            commands::reset::run(&mount, &zone)?;
        }
        Commands::Version => {
            println!("zonewal CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("zonewal core v{}", zonewal_core::VERSION);
        }
    }

    Ok(())
}
