//! JSON output for CLI commands
//!
//! One JSON value per line, UTF-8, flushed after every line.

use std::io::Write;

use serde::Serialize;

use super::errors::CliResult;

/// Write `value` as a single compact JSON line
pub fn write_json_line<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write pre-rendered JSON text followed by a newline
pub fn write_json<W: Write>(out: &mut W, json_str: &str) -> CliResult<()> {
    writeln!(out, "{}", json_str)?;
    out.flush()?;
    Ok(())
}
