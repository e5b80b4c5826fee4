//! CLI module for clustersm
//!
//! Provides command-line interface for:
//! - inspect-snapshot: Decode a file-backed snapshot
//! - check-config: Validate a node configuration file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, inspect_snapshot, inspect_snapshot_to, run, run_command, InspectSummary};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_json, write_json_line};
