//! Observable events
//!
//! Every log line names one of these. Events are explicit and typed so
//! tests can assert on them without matching message text.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    // Lifecycle
    /// Node started, snapshot (if any) applied
    NodeStart,
    /// Configuration applied to a node
    ConfigLoaded,

    // Inbound log dispatch
    /// Fragment shorter than a message header
    MessageTooShort,
    /// Recognised template whose body could not be decoded
    MessageMalformed,
    /// Template id not known to this node
    UnknownTemplate,
    /// Known template that is not a command
    UnexpectedTemplate,

    // Replies
    /// Reply handed to the session channel
    ReplySent,
    /// Reply not sent, a field exceeds the wire limits
    ReplyEncodeFailed,

    // Snapshot write
    /// Snapshot write started
    SnapshotStart,
    /// Snapshot write finished, end marker delivered
    SnapshotComplete,
    /// Offer hit back pressure or an admin action, will retry
    SnapshotOfferRetry,
    /// Offer hit a non-retryable publication state
    SnapshotOfferFatal,
    /// Offer did not succeed within the retry budget
    SnapshotOfferExhausted,
    /// Snapshot write abandoned before the end marker
    SnapshotAborted,
    /// Snapshot operation requested while another is active
    SnapshotBusy,

    // Snapshot load
    /// Snapshot load started
    SnapshotLoadStart,
    /// Snapshot load finished
    SnapshotLoadComplete,
    /// Stream ended without the end marker
    SnapshotLoadIncomplete,
    /// Snapshot record could not be decoded
    SnapshotRecordMalformed,
    /// Snapshot record with an unknown template
    SnapshotUnknownRecord,
    /// Snapshot file frame failed length or checksum validation
    SnapshotFrameCorrupt,

    // Client egress
    /// Add-participant acknowledgement received
    EgressParticipantAdded,
    /// Participant listing received
    EgressParticipantCount,
    /// One entry of a participant listing
    EgressParticipant,
    /// Empty participant listing received
    EgressNoParticipants,
    /// Reply with an unknown template
    EgressUnknownMessage,
    /// Reply shorter than a message header or undecodable
    EgressMalformed,
}

impl Event {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::NodeStart => "NODE_START",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::MessageTooShort => "MESSAGE_TOO_SHORT",
            Event::MessageMalformed => "MESSAGE_MALFORMED",
            Event::UnknownTemplate => "UNKNOWN_TEMPLATE",
            Event::UnexpectedTemplate => "UNEXPECTED_TEMPLATE",
            Event::ReplySent => "REPLY_SENT",
            Event::ReplyEncodeFailed => "REPLY_ENCODE_FAILED",
            Event::SnapshotStart => "SNAPSHOT_START",
            Event::SnapshotComplete => "SNAPSHOT_COMPLETE",
            Event::SnapshotOfferRetry => "SNAPSHOT_OFFER_RETRY",
            Event::SnapshotOfferFatal => "SNAPSHOT_OFFER_FATAL",
            Event::SnapshotOfferExhausted => "SNAPSHOT_OFFER_EXHAUSTED",
            Event::SnapshotAborted => "SNAPSHOT_ABORTED",
            Event::SnapshotBusy => "SNAPSHOT_BUSY",
            Event::SnapshotLoadStart => "SNAPSHOT_LOAD_START",
            Event::SnapshotLoadComplete => "SNAPSHOT_LOAD_COMPLETE",
            Event::SnapshotLoadIncomplete => "SNAPSHOT_LOAD_INCOMPLETE",
            Event::SnapshotRecordMalformed => "SNAPSHOT_RECORD_MALFORMED",
            Event::SnapshotUnknownRecord => "SNAPSHOT_UNKNOWN_RECORD",
            Event::SnapshotFrameCorrupt => "SNAPSHOT_FRAME_CORRUPT",
            Event::EgressParticipantAdded => "EGRESS_PARTICIPANT_ADDED",
            Event::EgressParticipantCount => "EGRESS_PARTICIPANT_COUNT",
            Event::EgressParticipant => "EGRESS_PARTICIPANT",
            Event::EgressNoParticipants => "EGRESS_NO_PARTICIPANTS",
            Event::EgressUnknownMessage => "EGRESS_UNKNOWN_MESSAGE",
            Event::EgressMalformed => "EGRESS_MALFORMED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
