//! Snapshot subsystem
//!
//! A snapshot is the participant listing written as a stream of
//! ParticipantSnapshot records closed by one EndOfSnapshot marker.
//!
//! # Write path
//!
//! Each record goes through a bounded retrying offer. Flow control is
//! retried with the configured idle strategy; a disconnected or full
//! channel abandons the snapshot at once.
//!
//! # Read path
//!
//! Records are applied strictly in the order the channel delivers them.
//! Unknown record kinds are skipped. Reaching end-of-stream without the
//! marker yields an incomplete load, which is surfaced but never fatal.
//!
//! # Concurrency
//!
//! Single-threaded and cooperative. The only waits are offer retries and
//! empty polls, both through the idle strategy.

mod channel;
mod checksum;
mod errors;
mod file;
mod idle;
mod manager;
mod offer;

pub use channel::{OfferClass, OfferOutcome, SnapshotImage, SnapshotPublication};
pub use checksum::{compute_checksum, verify_checksum};
pub use errors::{SnapshotError, SnapshotErrorCode, SnapshotResult};
pub use file::{
    FileSnapshotImage, FileSnapshotPublication, DEFAULT_MAX_SNAPSHOT_BYTES, FRAME_HEADER_LENGTH,
};
pub use idle::{BackoffIdleStrategy, BusySpinIdleStrategy, IdleStrategy, SleepingIdleStrategy};
pub use manager::{
    LoadStatus, SnapshotLoadReport, SnapshotManager, SnapshotState, SnapshotWriteSummary,
    DEFAULT_POLL_FRAGMENT_LIMIT,
};
pub use offer::{retrying_offer, OfferReport, OFFER_RETRY_COUNT};
