//! CLI argument definitions using clap
//!
//! Commands:
//! - clustersm inspect-snapshot --file <path> [--config <path>]
//! - clustersm check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// clustersm - replicated state machine message layer tools
#[derive(Parser, Debug)]
#[command(name = "clustersm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a file-backed snapshot and print its records as JSON lines
    InspectSnapshot {
        /// Path to the snapshot file
        #[arg(long)]
        file: PathBuf,

        /// Path to configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a configuration file and print the effective settings
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./clustersm.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
