//! Observability subsystem
//!
//! - Structured logging (JSON) through an injected `LogSink`
//! - Typed events
//! - Node counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use clustersm::observability::{Event, JsonLogger, LogSink, Severity};
//!
//! let log = JsonLogger::new(Severity::Info);
//! log.warn(Event::UnknownTemplate, &[("template_id", "42")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{format_line, JsonLogger, LogEntry, LogSink, MemoryLog, Severity};
pub use metrics::{MetricsSnapshot, NodeMetrics};
