//! Snapshot write and load
//!
//! Write: one ParticipantSnapshot record per participant in listing
//! order, then a single EndOfSnapshot marker. The first undeliverable
//! record abandons the publication.
//!
//! Load: poll until the image reports end-of-stream, restoring records
//! as they arrive. A stream that ends without the marker loads as
//! incomplete; that is a warning, not a failure.

use std::fmt;

use serde::Serialize;

use super::channel::{SnapshotImage, SnapshotPublication};
use super::errors::{SnapshotError, SnapshotResult};
use super::idle::IdleStrategy;
use super::offer::retrying_offer;
use crate::domain::ParticipantDomain;
use crate::observability::{Event, LogSink};
use crate::protocol::{
    encode_end_of_snapshot, encode_participant_snapshot, Decoded, SnapshotRecord,
};

/// Default number of fragments handed over per poll
pub const DEFAULT_POLL_FRAGMENT_LIMIT: usize = 20;

/// Which snapshot operation is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotState {
    Idle,
    Writing,
    Loading,
}

impl fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotState::Idle => write!(f, "idle"),
            SnapshotState::Writing => write!(f, "writing"),
            SnapshotState::Loading => write!(f, "loading"),
        }
    }
}

/// How a load ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// EndOfSnapshot was seen
    Loaded,
    /// The stream ended without EndOfSnapshot
    LoadedIncomplete,
}

/// Result of a completed snapshot write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotWriteSummary {
    pub participants_written: usize,
    /// Encoded bytes accepted by the publication, end marker included
    pub bytes_written: usize,
}

/// Result of a snapshot load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotLoadReport {
    pub status: LoadStatus,
    pub participants_restored: usize,
    pub unknown_records: usize,
    pub malformed_records: usize,
    pub fragments: usize,
}

impl SnapshotLoadReport {
    pub fn is_complete(&self) -> bool {
        self.status == LoadStatus::Loaded
    }
}

/// Per-load tallies kept while the poll loop runs
#[derive(Default)]
struct LoadTally {
    complete: bool,
    restored: usize,
    unknown: usize,
    malformed: usize,
}

/// Writes and loads participant snapshots.
///
/// The idle strategy is required up front and shared by both paths:
/// between offer retries and between polls that returned nothing.
pub struct SnapshotManager<L, I> {
    log: L,
    idle: I,
    poll_fragment_limit: usize,
    state: SnapshotState,
    completed: bool,
    scratch: Vec<u8>,
}

impl<L: LogSink, I: IdleStrategy> SnapshotManager<L, I> {
    pub fn new(log: L, idle: I, poll_fragment_limit: usize) -> Self {
        Self {
            log,
            idle,
            poll_fragment_limit: poll_fragment_limit.max(1),
            state: SnapshotState::Idle,
            completed: false,
            scratch: Vec::new(),
        }
    }

    pub fn state(&self) -> SnapshotState {
        self.state
    }

    /// True when the most recent load saw EndOfSnapshot
    pub fn completion_flag(&self) -> bool {
        self.completed
    }

    pub fn poll_fragment_limit(&self) -> usize {
        self.poll_fragment_limit
    }

    pub fn idle_strategy(&self) -> &I {
        &self.idle
    }

    /// Write every participant followed by EndOfSnapshot.
    ///
    /// On an undeliverable record the remaining writes are skipped, the
    /// publication is abandoned and the error reports how many
    /// participants made it out.
    pub fn take_snapshot<D, P>(
        &mut self,
        domain: &D,
        publication: &mut P,
    ) -> SnapshotResult<SnapshotWriteSummary>
    where
        D: ParticipantDomain + ?Sized,
        P: SnapshotPublication + ?Sized,
    {
        self.enter(SnapshotState::Writing)?;

        let participants = domain.participant_list();
        self.log.info(
            Event::SnapshotStart,
            &[("participants", &participants.len().to_string())],
        );

        let mut bytes_written = 0;
        for (written, participant) in participants.iter().enumerate() {
            self.scratch.clear();
            if let Err(err) = encode_participant_snapshot(
                &mut self.scratch,
                participant.participant_id,
                &participant.name,
            ) {
                let error = SnapshotError::encode_failed(err, written);
                return Err(self.abort(publication, error, participant.participant_id));
            }
            let report = retrying_offer(publication, &mut self.idle, &self.log, &self.scratch);
            if !report.is_delivered() {
                let error = SnapshotError::offer_failed(report, written);
                return Err(self.abort(publication, error, participant.participant_id));
            }
            bytes_written += self.scratch.len();
        }

        self.scratch.clear();
        encode_end_of_snapshot(&mut self.scratch);
        let report = retrying_offer(publication, &mut self.idle, &self.log, &self.scratch);
        if !report.is_delivered() {
            let written = participants.len();
            self.state = SnapshotState::Idle;
            self.log.error(
                Event::SnapshotAborted,
                &[
                    ("reason", &report.to_string()),
                    ("record", "end_of_snapshot"),
                    ("records_written", &written.to_string()),
                ],
            );
            publication.abandon();
            return Err(SnapshotError::offer_failed(report, written).with_details("end of snapshot"));
        }
        bytes_written += self.scratch.len();

        self.state = SnapshotState::Idle;
        let summary = SnapshotWriteSummary {
            participants_written: participants.len(),
            bytes_written,
        };
        self.log.info(
            Event::SnapshotComplete,
            &[
                ("bytes", &bytes_written.to_string()),
                ("participants", &summary.participants_written.to_string()),
            ],
        );
        Ok(summary)
    }

    /// Restore participants from `image` until it reports end-of-stream.
    pub fn load_snapshot<D, S>(
        &mut self,
        domain: &mut D,
        image: &mut S,
    ) -> SnapshotResult<SnapshotLoadReport>
    where
        D: ParticipantDomain + ?Sized,
        S: SnapshotImage + ?Sized,
    {
        self.enter(SnapshotState::Loading)?;
        self.completed = false;
        self.idle.reset();
        self.log.info(Event::SnapshotLoadStart, &[]);

        let log = &self.log;
        let idle = &mut self.idle;
        let limit = self.poll_fragment_limit;
        let mut tally = LoadTally::default();
        let mut fragments = 0;

        {
            let mut handler = |message: &[u8]| match SnapshotRecord::decode(message) {
                Ok(Decoded::Message(SnapshotRecord::Participant {
                    participant_id,
                    name,
                })) => {
                    domain.restore_participant(participant_id, &name);
                    tally.restored += 1;
                }
                Ok(Decoded::Message(SnapshotRecord::EndOfSnapshot)) => {
                    tally.complete = true;
                }
                Ok(Decoded::Unknown(header)) => {
                    log.warn(
                        Event::SnapshotUnknownRecord,
                        &[("template_id", &header.template_id.to_string())],
                    );
                    tally.unknown += 1;
                }
                Err(err) => {
                    log.error(
                        Event::SnapshotRecordMalformed,
                        &[("reason", &err.to_string())],
                    );
                    tally.malformed += 1;
                }
            };

            while !image.is_end_of_stream() {
                let polled = image.poll(&mut handler, limit);
                fragments += polled;
                idle.idle_with(polled);
            }
        }

        self.completed = tally.complete;
        self.state = SnapshotState::Idle;

        let report = SnapshotLoadReport {
            status: if tally.complete {
                LoadStatus::Loaded
            } else {
                LoadStatus::LoadedIncomplete
            },
            participants_restored: tally.restored,
            unknown_records: tally.unknown,
            malformed_records: tally.malformed,
            fragments,
        };

        let restored = report.participants_restored.to_string();
        let fragments = report.fragments.to_string();
        if report.is_complete() {
            self.log.info(
                Event::SnapshotLoadComplete,
                &[("fragments", &fragments), ("participants", &restored)],
            );
        } else {
            self.log.warn(
                Event::SnapshotLoadIncomplete,
                &[
                    ("fragments", &fragments),
                    ("participants", &restored),
                    ("reason", "snapshot ended without end-of-snapshot marker"),
                ],
            );
        }
        Ok(report)
    }

    fn enter(&mut self, next: SnapshotState) -> SnapshotResult<()> {
        if self.state != SnapshotState::Idle {
            self.log.error(
                Event::SnapshotBusy,
                &[
                    ("active", &self.state.to_string()),
                    ("requested", &next.to_string()),
                ],
            );
            return Err(SnapshotError::busy(self.state.to_string()));
        }
        self.state = next;
        Ok(())
    }

    fn abort<P: SnapshotPublication + ?Sized>(
        &mut self,
        publication: &mut P,
        error: SnapshotError,
        participant_id: i64,
    ) -> SnapshotError {
        self.state = SnapshotState::Idle;
        let reason = match error.offer() {
            Some(report) => report.to_string(),
            None => error.message().to_string(),
        };
        self.log.error(
            Event::SnapshotAborted,
            &[
                ("participant_id", &participant_id.to_string()),
                ("reason", &reason),
                ("records_written", &error.records_written().to_string()),
            ],
        );
        publication.abandon();
        error.with_details(format!("participant {}", participant_id))
    }
}
