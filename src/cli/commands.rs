//! CLI command implementations
//!
//! Commands are read-only: they never write snapshot files or touch a
//! running node.

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::json;

use crate::config::NodeConfig;
use crate::protocol::{Decoded, SnapshotRecord};
use crate::snapshot::{FileSnapshotImage, SnapshotImage};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_json, write_json_line};

/// Totals printed after the records of an inspected snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InspectSummary {
    pub records: usize,
    pub participants: usize,
    pub complete: bool,
    pub corrupt_frames: usize,
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::InspectSnapshot { file, config } => inspect_snapshot(&file, config.as_deref()),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Print every record of a file-backed snapshot, then a summary.
///
/// Fails when the snapshot is missing its end marker, after the summary
/// has been printed.
pub fn inspect_snapshot(file: &Path, config_path: Option<&Path>) -> CliResult<()> {
    let config = match config_path {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = inspect_snapshot_to(file, &config, &mut out)?;

    if !summary.complete {
        return Err(CliError::snapshot_incomplete(format!(
            "{} ended without an end-of-snapshot marker ({} corrupt frame(s))",
            file.display(),
            summary.corrupt_frames
        )));
    }
    Ok(())
}

/// Decode `file` and write one JSON line per record plus the summary line to `out`
pub fn inspect_snapshot_to<W: Write>(
    file: &Path,
    config: &NodeConfig,
    out: &mut W,
) -> CliResult<InspectSummary> {
    let mut image = FileSnapshotImage::open(file, config.logger()?)?;
    let mut summary = InspectSummary {
        records: 0,
        participants: 0,
        complete: false,
        corrupt_frames: 0,
    };

    let mut batch: Vec<Vec<u8>> = Vec::new();
    while !image.is_end_of_stream() {
        batch.clear();
        image.poll(
            &mut |message: &[u8]| batch.push(message.to_vec()),
            config.snapshot.poll_fragment_limit,
        );

        for message in &batch {
            summary.records += 1;
            match SnapshotRecord::decode(message) {
                Ok(Decoded::Message(record)) => {
                    match record {
                        SnapshotRecord::Participant { .. } => summary.participants += 1,
                        SnapshotRecord::EndOfSnapshot => summary.complete = true,
                    }
                    write_json_line(out, &record)?;
                }
                Ok(Decoded::Unknown(header)) => {
                    write_json_line(
                        out,
                        &json!({"type": "unknown", "template_id": header.template_id}),
                    )?;
                }
                Err(err) => {
                    write_json_line(
                        out,
                        &json!({"type": "malformed", "reason": err.to_string()}),
                    )?;
                }
            }
        }
    }

    summary.corrupt_frames = image.corrupt_frames();
    write_json_line(out, &json!({ "summary": summary }))?;
    Ok(summary)
}

/// Validate a configuration file and print the effective configuration
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = NodeConfig::load(config_path)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_json(&mut out, &config.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_participant_snapshot;
    use crate::snapshot::{FileSnapshotPublication, SnapshotPublication};
    use tempfile::TempDir;

    fn write_snapshot(path: &Path, participants: &[(i64, &str)], with_marker: bool) {
        let mut publication = FileSnapshotPublication::create(path, 1 << 20).unwrap();
        for (id, name) in participants {
            let mut bytes = Vec::new();
            encode_participant_snapshot(&mut bytes, *id, name).unwrap();
            publication.offer(&bytes);
        }
        if with_marker {
            let mut bytes = Vec::new();
            SnapshotRecord::EndOfSnapshot.encode(&mut bytes).unwrap();
            publication.offer(&bytes);
        }
        publication.finish().unwrap();
    }

    #[test]
    fn test_inspect_complete_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.bin");
        write_snapshot(&path, &[(1, "A"), (2, "B")], true);

        let mut out = Vec::new();
        let summary = inspect_snapshot_to(&path, &NodeConfig::default(), &mut out).unwrap();

        assert_eq!(
            summary,
            InspectSummary {
                records: 3,
                participants: 2,
                complete: true,
                corrupt_frames: 0
            }
        );
        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["type"], "participant");
        assert_eq!(lines[0]["participant_id"], 1);
        assert_eq!(lines[1]["name"], "B");
        assert_eq!(lines[2]["type"], "end_of_snapshot");
        assert_eq!(lines[3]["summary"]["complete"], true);
    }

    #[test]
    fn test_inspect_incomplete_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.bin");
        write_snapshot(&path, &[(5, "E")], false);

        let mut out = Vec::new();
        let summary = inspect_snapshot_to(&path, &NodeConfig::default(), &mut out).unwrap();

        assert!(!summary.complete);
        assert_eq!(summary.participants, 1);
    }

    #[test]
    fn test_inspect_incomplete_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.bin");
        write_snapshot(&path, &[], false);

        let err = inspect_snapshot(&path, None).unwrap_err();
        assert_eq!(err.code_str(), "CLUSTER_CLI_SNAPSHOT_INCOMPLETE");
    }

    #[test]
    fn test_check_config_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"responder": {"initial_buffer_capacity": 0}}"#).unwrap();

        let err = check_config(&path).unwrap_err();
        assert_eq!(err.code_str(), "CLUSTER_CLI_CONFIG_ERROR");
        assert!(err.message().contains("initial_buffer_capacity"));
    }
}
