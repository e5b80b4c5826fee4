//! Structured JSON logging through an injected sink
//!
//! Every component receives a `LogSink` at construction. There is no
//! global logger; tests hand in a `MemoryLog` and assert on what was
//! emitted.
//!
//! Line format:
//! - One log line = one event
//! - `event` first, `severity` second, remaining fields sorted by key
//! - Synchronous, no buffering

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use super::events::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Unrecoverable, process exits
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Parses a severity name, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "TRACE" => Some(Severity::Trace),
            "INFO" => Some(Severity::Info),
            "WARN" => Some(Severity::Warn),
            "ERROR" => Some(Severity::Error),
            "FATAL" => Some(Severity::Fatal),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Destination for structured diagnostics.
pub trait LogSink {
    /// Emit one event with the given severity and fields.
    fn log(&self, severity: Severity, event: Event, fields: &[(&str, &str)]);

    /// Log at TRACE level
    fn trace(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    fn info(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    fn warn(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    fn error(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Error, event, fields);
    }
}

impl<T: LogSink + ?Sized> LogSink for &T {
    fn log(&self, severity: Severity, event: Event, fields: &[(&str, &str)]) {
        (**self).log(severity, event, fields);
    }
}

impl<T: LogSink + ?Sized> LogSink for Rc<T> {
    fn log(&self, severity: Severity, event: Event, fields: &[(&str, &str)]) {
        (**self).log(severity, event, fields);
    }
}

/// Logger writing JSON lines: INFO and below to stdout, WARN and above to stderr.
#[derive(Debug, Clone, Copy)]
pub struct JsonLogger {
    min_severity: Severity,
}

impl JsonLogger {
    /// Create a logger that drops events below `min_severity`
    pub fn new(min_severity: Severity) -> Self {
        Self { min_severity }
    }

    /// Minimum severity this logger emits
    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: Event,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let line = format_line(severity, event, fields);
        // Write atomically (one syscall); logging failures never reach the caller
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

impl Default for JsonLogger {
    fn default() -> Self {
        Self::new(Severity::Info)
    }
}

impl LogSink for JsonLogger {
    fn log(&self, severity: Severity, event: Event, fields: &[(&str, &str)]) {
        if severity < self.min_severity {
            return;
        }
        if severity >= Severity::Warn {
            Self::log_to_writer(severity, event, fields, &mut io::stderr());
        } else {
            Self::log_to_writer(severity, event, fields, &mut io::stdout());
        }
    }
}

/// Render one event as a newline-terminated JSON object.
///
/// Fields are output in deterministic order (alphabetical by key).
pub fn format_line(severity: Severity, event: Event, fields: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(256);

    output.push('{');

    output.push_str("\"event\":\"");
    escape_json_string(&mut output, event.as_str());
    output.push('"');

    output.push_str(",\"severity\":\"");
    output.push_str(severity.as_str());
    output.push('"');

    let mut sorted_fields: Vec<_> = fields.iter().collect();
    sorted_fields.sort_by_key(|(k, _)| *k);

    for (key, value) in sorted_fields {
        output.push_str(",\"");
        escape_json_string(&mut output, key);
        output.push_str("\":\"");
        escape_json_string(&mut output, value);
        output.push('"');
    }

    output.push('}');
    output.push('\n');
    output
}

fn escape_json_string(output: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c.is_control() => {
                output.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => output.push(c),
        }
    }
}

/// One captured log event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub severity: Severity,
    pub event: Event,
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Value of a field, if present
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory sink. Clones share the same buffer, so a test can keep one
/// handle and give another to the component under test.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    entries: Rc<RefCell<Vec<LogEntry>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    /// Entries for one event kind
    pub fn find(&self, event: Event) -> Vec<LogEntry> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.event == event)
            .cloned()
            .collect()
    }

    pub fn contains(&self, event: Event) -> bool {
        self.entries.borrow().iter().any(|e| e.event == event)
    }

    /// Number of entries at exactly `severity`
    pub fn count_at(&self, severity: Severity) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl LogSink for MemoryLog {
    fn log(&self, severity: Severity, event: Event, fields: &[(&str, &str)]) {
        self.entries.borrow_mut().push(LogEntry {
            severity,
            event,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
    }
}
