//! segwal CLI
//!
//! Command-line tools for inspecting segment directories.
//!
//! # Commands
//!
//! - `list` - List segments in base-index order
//! - `inspect` - Display the header and record range of one segment
//! - `verify` - Read every record of every sealed segment
//! - `dump` - Dump the records of one segment for debugging

mod commands;

use clap::{Parser, Subcommand};
use segwal_core::Filer;
use segwal_storage::FsVfs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// segwal command-line segment tools.
#[derive(Parser)]
#[command(name = "segwal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the segment directory
    #[arg(global = true, short, long)]
    dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List segments in the directory
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Display segment header and record range
    Inspect {
        /// Base index of the segment
        #[arg(short, long)]
        base_index: u64,

        /// Segment id
        #[arg(short, long)]
        id: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify every record of every sealed segment
    Verify {
        /// Skip the newest segment, which may still be unsealed
        #[arg(short, long)]
        skip_tail: bool,
    },

    /// Dump segment records for debugging
    Dump {
        /// Base index of the segment
        #[arg(short, long)]
        base_index: u64,

        /// Segment id
        #[arg(short, long)]
        id: u64,

        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let filer = |name: &str| -> Result<Filer, Box<dyn std::error::Error>> {
        let dir = cli
            .dir
            .clone()
            .ok_or_else(|| format!("Segment directory required for {name}"))?;
        Ok(Filer::new(dir, Arc::new(FsVfs::new())))
    };

    match &cli.command {
        Commands::List { format } => {
            commands::list::run(&filer("list")?, format)?;
        }
        Commands::Inspect {
            base_index,
            id,
            format,
        } => {
            commands::inspect::run(&filer("inspect")?, *base_index, *id, format)?;
        }
        Commands::Verify { skip_tail } => {
            commands::verify::run(&filer("verify")?, *skip_tail)?;
        }
        Commands::Dump {
            base_index,
            id,
            limit,
            format,
        } => {
            commands::dump::run(&filer("dump")?, *base_index, *id, *limit, format)?;
        }
        Commands::Version => {
            println!("segwal CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("segwal Core v{}", segwal_core::VERSION);
        }
    }

    Ok(())
}
