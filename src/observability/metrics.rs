//! Node counters
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Atomic so a monitoring thread can read them while the service
//!   thread increments

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one node
#[derive(Debug, Default)]
pub struct NodeMetrics {
    commands_applied: AtomicU64,
    messages_dropped: AtomicU64,
    unknown_templates: AtomicU64,
    replies_sent: AtomicU64,
    snapshots_written: AtomicU64,
    snapshot_write_failures: AtomicU64,
    snapshots_loaded: AtomicU64,
    incomplete_loads: AtomicU64,
}

impl NodeMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_commands_applied(&self) {
        self.commands_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts every dropped inbound message, unknown templates included
    pub fn increment_messages_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unknown_templates(&self) {
        self.unknown_templates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_replies_sent(&self) {
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_snapshots_written(&self) {
        self.snapshots_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_snapshot_write_failures(&self) {
        self.snapshot_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_snapshots_loaded(&self) {
        self.snapshots_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_incomplete_loads(&self) {
        self.incomplete_loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all counters as a plain value
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands_applied: self.commands_applied.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            unknown_templates: self.unknown_templates.load(Ordering::Relaxed),
            replies_sent: self.replies_sent.load(Ordering::Relaxed),
            snapshots_written: self.snapshots_written.load(Ordering::Relaxed),
            snapshot_write_failures: self.snapshot_write_failures.load(Ordering::Relaxed),
            snapshots_loaded: self.snapshots_loaded.load(Ordering::Relaxed),
            incomplete_loads: self.incomplete_loads.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub commands_applied: u64,
    pub messages_dropped: u64,
    pub unknown_templates: u64,
    pub replies_sent: u64,
    pub snapshots_written: u64,
    pub snapshot_write_failures: u64,
    pub snapshots_loaded: u64,
    pub incomplete_loads: u64,
}

impl MetricsSnapshot {
    /// Render as a single JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}
