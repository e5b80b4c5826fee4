//! Snapshot error types
//!
//! Error codes:
//! - CLUSTER_SNAPSHOT_OFFER_FAILED (ERROR severity)
//! - CLUSTER_SNAPSHOT_BUSY (ERROR severity)
//! - CLUSTER_SNAPSHOT_IO (ERROR severity)
//! - CLUSTER_SNAPSHOT_ENCODE (ERROR severity)
//!
//! None of these are fatal to the process: a failed snapshot operation is
//! reported and the service keeps consuming the log.

use std::fmt;
use std::io;

use super::offer::OfferReport;
use crate::observability::Severity;
use crate::protocol::ProtocolError;

/// Snapshot-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotErrorCode {
    /// A record could not be delivered; the snapshot was abandoned
    OfferFailed,
    /// Another snapshot operation is already active
    Busy,
    /// I/O failure in a file-backed snapshot channel
    Io,
    /// A participant record exceeds the wire limits; the snapshot was abandoned
    Encode,
}

impl SnapshotErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SnapshotErrorCode::OfferFailed => "CLUSTER_SNAPSHOT_OFFER_FAILED",
            SnapshotErrorCode::Busy => "CLUSTER_SNAPSHOT_BUSY",
            SnapshotErrorCode::Io => "CLUSTER_SNAPSHOT_IO",
            SnapshotErrorCode::Encode => "CLUSTER_SNAPSHOT_ENCODE",
        }
    }

    /// Every snapshot error fails the operation, never the process
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for SnapshotErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Snapshot error with context
#[derive(Debug)]
pub struct SnapshotError {
    code: SnapshotErrorCode,
    message: String,
    details: Option<String>,
    /// Participant records delivered before the failure
    records_written: usize,
    /// How the failing offer ended
    offer: Option<OfferReport>,
    source: Option<io::Error>,
}

impl SnapshotError {
    /// A record offer failed; `records_written` participants were already delivered
    pub fn offer_failed(report: OfferReport, records_written: usize) -> Self {
        Self {
            code: SnapshotErrorCode::OfferFailed,
            message: format!("snapshot abandoned: {}", report),
            details: None,
            records_written,
            offer: Some(report),
            source: None,
        }
    }

    /// A participant record could not be encoded; `records_written`
    /// participants were already delivered
    pub fn encode_failed(err: ProtocolError, records_written: usize) -> Self {
        Self {
            code: SnapshotErrorCode::Encode,
            message: format!("snapshot abandoned: {}", err),
            details: None,
            records_written,
            offer: None,
            source: None,
        }
    }

    /// A snapshot operation was requested while another was active
    pub fn busy(active: impl Into<String>) -> Self {
        Self {
            code: SnapshotErrorCode::Busy,
            message: format!("snapshot operation already active: {}", active.into()),
            details: None,
            records_written: 0,
            offer: None,
            source: None,
        }
    }

    /// Create a snapshot I/O error
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: SnapshotErrorCode::Io,
            message: message.into(),
            details: None,
            records_written: 0,
            offer: None,
            source: Some(source),
        }
    }

    /// Create a snapshot I/O error with path context
    pub fn io_error_at_path(path: &std::path::Path, source: io::Error) -> Self {
        Self::io_error(format!("I/O error at path: {}", path.display()), source)
    }

    /// Add details to an error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn code(&self) -> SnapshotErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Participant records delivered before an offer failure
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// The failed offer, for `OfferFailed` errors
    pub fn offer(&self) -> Option<&OfferReport> {
        self.offer.as_ref()
    }

    /// Snapshot errors never require process termination
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;
