//! Bounded retrying offer
//!
//! Each snapshot record is offered at most `OFFER_RETRY_COUNT` times.
//! Flow-control refusals idle once and try again; terminal refusals stop
//! at once. Closed is terminal.

use std::fmt;

use super::channel::{OfferClass, OfferOutcome, SnapshotPublication};
use super::idle::IdleStrategy;
use crate::observability::{Event, LogSink};

/// Offer attempts per snapshot record
pub const OFFER_RETRY_COUNT: u32 = 3;

/// How one retrying offer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferReport {
    /// The publication accepted the message
    Delivered {
        position: u64,
        attempts: u32,
        /// Idle calls made between attempts
        waits: u32,
    },
    /// The publication refused with a non-retryable outcome
    Fatal { outcome: OfferOutcome, attempts: u32 },
    /// Every attempt met flow control
    RetriesExhausted { attempts: u32 },
}

impl OfferReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self, OfferReport::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            OfferReport::Delivered { attempts, .. }
            | OfferReport::Fatal { attempts, .. }
            | OfferReport::RetriesExhausted { attempts } => *attempts,
        }
    }
}

impl fmt::Display for OfferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferReport::Delivered {
                position, attempts, ..
            } => write!(f, "delivered at position {} after {} attempt(s)", position, attempts),
            OfferReport::Fatal { outcome, attempts } => {
                write!(f, "offer refused ({}) on attempt {}", outcome, attempts)
            }
            OfferReport::RetriesExhausted { attempts } => {
                write!(f, "failed to offer snapshot within {} retries", attempts)
            }
        }
    }
}

/// Offer `message` until it is accepted, a terminal outcome is seen, or
/// the retry budget runs out. Idles exactly once after each retryable
/// refusal except the last.
pub fn retrying_offer<P, I, L>(
    publication: &mut P,
    idle: &mut I,
    log: &L,
    message: &[u8],
) -> OfferReport
where
    P: SnapshotPublication + ?Sized,
    I: IdleStrategy + ?Sized,
    L: LogSink + ?Sized,
{
    let mut waits = 0;
    for attempt in 1..=OFFER_RETRY_COUNT {
        let outcome = publication.offer(message);
        match (outcome.class(), outcome) {
            (OfferClass::Success, OfferOutcome::Accepted(position)) => {
                return OfferReport::Delivered {
                    position,
                    attempts: attempt,
                    waits,
                };
            }
            (OfferClass::Retryable, _) => {
                log.warn(
                    Event::SnapshotOfferRetry,
                    &[
                        ("attempt", &attempt.to_string()),
                        ("outcome", &outcome.to_string()),
                    ],
                );
                if attempt < OFFER_RETRY_COUNT {
                    idle.idle();
                    waits += 1;
                }
            }
            _ => {
                log.error(
                    Event::SnapshotOfferFatal,
                    &[
                        ("attempt", &attempt.to_string()),
                        ("outcome", &outcome.to_string()),
                    ],
                );
                return OfferReport::Fatal {
                    outcome,
                    attempts: attempt,
                };
            }
        }
    }

    let report = OfferReport::RetriesExhausted {
        attempts: OFFER_RETRY_COUNT,
    };
    log.error(
        Event::SnapshotOfferExhausted,
        &[("reason", &report.to_string())],
    );
    report
}
