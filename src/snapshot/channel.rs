//! Snapshot channel contracts
//!
//! The hosting framework supplies a publication when a snapshot is
//! requested and an image when a snapshot is available at start-up.

use std::fmt;

/// Result of one offer to a snapshot publication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Delivered; the new stream position, always positive
    Accepted(u64),
    /// Flow control: the consumer is behind
    BackPressured,
    /// Flow control: the channel is handling an administrative action
    AdminAction,
    /// No consumer is connected
    NotConnected,
    /// The stream reached its position or capacity limit
    MaxPositionExceeded,
    /// The publication was closed
    Closed,
}

/// How the retrying offer treats an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferClass {
    Success,
    Retryable,
    Fatal,
}

impl OfferOutcome {
    pub fn class(&self) -> OfferClass {
        match self {
            OfferOutcome::Accepted(_) => OfferClass::Success,
            OfferOutcome::BackPressured | OfferOutcome::AdminAction => OfferClass::Retryable,
            OfferOutcome::NotConnected
            | OfferOutcome::MaxPositionExceeded
            | OfferOutcome::Closed => OfferClass::Fatal,
        }
    }
}

impl fmt::Display for OfferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferOutcome::Accepted(position) => write!(f, "accepted at position {}", position),
            OfferOutcome::BackPressured => write!(f, "back pressured"),
            OfferOutcome::AdminAction => write!(f, "admin action"),
            OfferOutcome::NotConnected => write!(f, "not connected"),
            OfferOutcome::MaxPositionExceeded => write!(f, "max position exceeded"),
            OfferOutcome::Closed => write!(f, "closed"),
        }
    }
}

/// Outbound snapshot stream
pub trait SnapshotPublication {
    /// Offer one complete message
    fn offer(&mut self, message: &[u8]) -> OfferOutcome;

    /// Called once when a snapshot write is abandoned before its end
    /// marker, so storage can discard the partial stream instead of
    /// treating it as a short snapshot.
    fn abandon(&mut self) {}
}

impl<P: SnapshotPublication + ?Sized> SnapshotPublication for &mut P {
    fn offer(&mut self, message: &[u8]) -> OfferOutcome {
        (**self).offer(message)
    }

    fn abandon(&mut self) {
        (**self).abandon();
    }
}

/// Inbound snapshot stream
pub trait SnapshotImage {
    /// Deliver up to `fragment_limit` messages to `handler`, in stream
    /// order, returning how many were delivered.
    fn poll(&mut self, handler: &mut dyn FnMut(&[u8]), fragment_limit: usize) -> usize;

    /// True once the producer has finished and every message was polled
    fn is_end_of_stream(&self) -> bool;
}

impl<I: SnapshotImage + ?Sized> SnapshotImage for &mut I {
    fn poll(&mut self, handler: &mut dyn FnMut(&[u8]), fragment_limit: usize) -> usize {
        (**self).poll(handler, fragment_limit)
    }

    fn is_end_of_stream(&self) -> bool {
        (**self).is_end_of_stream()
    }
}
