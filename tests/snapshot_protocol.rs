//! Snapshot Protocol Tests
//!
//! Write and load through in-memory channels:
//! - A written snapshot loads back into a fresh model, completion flag set
//! - A stream without its end marker loads as incomplete, without failing
//! - Offers retry flow control a bounded number of times
//! - Terminal refusals abandon the snapshot after one attempt
//! - Unknown and malformed records are skipped

mod support;

use clustersm::domain::{Participant, ParticipantDomain};
use clustersm::observability::{Event, MemoryLog, Severity};
use clustersm::protocol::{encode_participant_snapshot, MessageHeader, SnapshotRecord, SCHEMA_ID};
use clustersm::snapshot::{
    retrying_offer, LoadStatus, OfferOutcome, OfferReport, SnapshotErrorCode, SnapshotManager,
    SnapshotState, OFFER_RETRY_COUNT,
};

use support::{CountingIdle, MemoryImage, Participants, ScriptedPublication};

// =============================================================================
// Test Utilities
// =============================================================================

fn manager(log: &MemoryLog) -> SnapshotManager<MemoryLog, CountingIdle> {
    SnapshotManager::new(log.clone(), CountingIdle::default(), 20)
}

fn participant_record(participant_id: i64, name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    encode_participant_snapshot(&mut out, participant_id, name).unwrap();
    out
}

fn end_marker() -> Vec<u8> {
    let mut out = Vec::new();
    SnapshotRecord::EndOfSnapshot.encode(&mut out).unwrap();
    out
}

// =============================================================================
// Write then load
// =============================================================================

/// {(1,"A"),(2,"B")} written and loaded into a fresh model comes back whole.
#[test]
fn test_write_then_load_restores_participants() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);
    let source = Participants::with(&[(1, "A"), (2, "B")]);
    let mut publication = ScriptedPublication::accepting();

    let summary = manager.take_snapshot(&source, &mut publication).unwrap();
    assert_eq!(summary.participants_written, 2);
    assert_eq!(publication.accepted.len(), 3);
    assert_eq!(publication.accepted[2], end_marker());
    assert_eq!(publication.abandoned, 0);

    let mut restored = Participants::detached();
    let mut image = MemoryImage::new(publication.accepted.clone());
    let report = manager.load_snapshot(&mut restored, &mut image).unwrap();

    assert_eq!(report.status, LoadStatus::Loaded);
    assert_eq!(report.participants_restored, 2);
    assert!(manager.completion_flag());
    assert_eq!(
        restored.sorted(),
        vec![Participant::new(1, "A"), Participant::new(2, "B")]
    );
    assert!(log.contains(Event::SnapshotComplete));
    assert!(log.contains(Event::SnapshotLoadComplete));
}

/// Records are written in listing order, one per participant.
#[test]
fn test_records_follow_listing_order() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);
    let source = Participants::with(&[(9, "I"), (4, "D"), (6, "F")]);
    let mut publication = ScriptedPublication::accepting();

    manager.take_snapshot(&source, &mut publication).unwrap();

    assert_eq!(
        publication.accepted,
        vec![
            participant_record(9, "I"),
            participant_record(4, "D"),
            participant_record(6, "F"),
            end_marker()
        ]
    );
}

/// An empty model writes just the end marker and loads as complete.
#[test]
fn test_empty_snapshot() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);
    let mut publication = ScriptedPublication::accepting();

    let summary = manager
        .take_snapshot(&Participants::detached(), &mut publication)
        .unwrap();
    assert_eq!(summary.participants_written, 0);
    assert_eq!(summary.bytes_written, MessageHeader::ENCODED_LENGTH);

    let mut image = MemoryImage::new(publication.accepted);
    let report = manager
        .load_snapshot(&mut Participants::detached(), &mut image)
        .unwrap();
    assert_eq!(report.status, LoadStatus::Loaded);
    assert_eq!(report.participants_restored, 0);
}

// =============================================================================
// Structural incompleteness
// =============================================================================

/// A stream that ends before EndOfSnapshot loads as incomplete and warns.
#[test]
fn test_missing_end_marker_is_incomplete() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);
    let mut restored = Participants::detached();
    let mut image = MemoryImage::new(vec![participant_record(1, "A"), participant_record(2, "B")]);

    let report = manager.load_snapshot(&mut restored, &mut image).unwrap();

    assert_eq!(report.status, LoadStatus::LoadedIncomplete);
    assert!(!report.is_complete());
    assert!(!manager.completion_flag());
    assert_eq!(report.participants_restored, 2);
    assert_eq!(report.malformed_records, 0);
    assert_eq!(restored.len(), 2);
    let warning = &log.find(Event::SnapshotLoadIncomplete)[0];
    assert_eq!(warning.severity, Severity::Warn);
    assert_eq!(manager.state(), SnapshotState::Idle);
}

/// An empty stream is incomplete too.
#[test]
fn test_empty_stream_is_incomplete() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);

    let report = manager
        .load_snapshot(&mut Participants::detached(), &mut MemoryImage::new(vec![]))
        .unwrap();

    assert_eq!(report.status, LoadStatus::LoadedIncomplete);
    assert_eq!(report.fragments, 0);
}

/// The completion flag describes the latest load only.
#[test]
fn test_completion_flag_reset_per_load() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);

    let mut complete = MemoryImage::new(vec![end_marker()]);
    manager
        .load_snapshot(&mut Participants::detached(), &mut complete)
        .unwrap();
    assert!(manager.completion_flag());

    let mut short = MemoryImage::new(vec![participant_record(1, "A")]);
    manager
        .load_snapshot(&mut Participants::detached(), &mut short)
        .unwrap();
    assert!(!manager.completion_flag());
}

// =============================================================================
// Forward compatibility and corruption
// =============================================================================

/// Unknown record kinds are skipped with a warning; the load still completes.
#[test]
fn test_unknown_records_skipped() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);
    let mut unknown = Vec::new();
    MessageHeader {
        block_length: 4,
        template_id: 150,
        schema_id: SCHEMA_ID,
        version: 2,
    }
    .encode(&mut unknown);
    unknown.extend_from_slice(&[1, 2, 3, 4]);

    let mut image = MemoryImage::new(vec![
        participant_record(1, "A"),
        unknown,
        participant_record(2, "B"),
        end_marker(),
    ]);
    let mut restored = Participants::detached();
    let report = manager.load_snapshot(&mut restored, &mut image).unwrap();

    assert_eq!(report.status, LoadStatus::Loaded);
    assert_eq!(report.unknown_records, 1);
    assert_eq!(restored.len(), 2);
    let warning = &log.find(Event::SnapshotUnknownRecord)[0];
    assert_eq!(warning.field("template_id"), Some("150"));
}

/// A malformed record is reported at ERROR and the load carries on.
#[test]
fn test_malformed_record_skipped() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);
    let mut torn = participant_record(3, "Carol");
    torn.truncate(torn.len() - 3);

    let mut image = MemoryImage::new(vec![torn, vec![0x01], participant_record(4, "Dan"), end_marker()]);
    let mut restored = Participants::detached();
    let report = manager.load_snapshot(&mut restored, &mut image).unwrap();

    assert_eq!(report.malformed_records, 2);
    assert_eq!(report.participants_restored, 1);
    assert!(restored.get(3).is_none());
    assert_eq!(log.find(Event::SnapshotRecordMalformed).len(), 2);
}

/// A stream repeating a participant leaves one participant.
#[test]
fn test_duplicate_records_are_idempotent() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);
    let mut image = MemoryImage::new(vec![
        participant_record(1, "A"),
        participant_record(1, "A"),
        end_marker(),
    ]);
    let mut restored = Participants::detached();

    manager.load_snapshot(&mut restored, &mut image).unwrap();

    assert_eq!(restored.participant_list(), vec![Participant::new(1, "A")]);
}

// =============================================================================
// Load pacing
// =============================================================================

/// The idle strategy is reset before loading and used between empty polls.
#[test]
fn test_load_idles_between_empty_polls() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);
    let mut image = MemoryImage::new(vec![participant_record(1, "A"), end_marker()]).with_empty_polls(3);

    let report = manager
        .load_snapshot(&mut Participants::detached(), &mut image)
        .unwrap();

    assert_eq!(report.status, LoadStatus::Loaded);
    assert_eq!(manager.idle_strategy().idles, 3);
    // one reset up front, one after the poll that did work
    assert_eq!(manager.idle_strategy().resets, 2);
    assert_eq!(image.polls, 4);
}

/// No more than the fragment limit is requested per poll.
#[test]
fn test_fragment_limit_bounds_each_poll() {
    let log = MemoryLog::new();
    let mut manager = SnapshotManager::new(log.clone(), CountingIdle::default(), 2);
    let mut messages: Vec<Vec<u8>> = (0..5).map(|i| participant_record(i, "p")).collect();
    messages.push(end_marker());
    let mut image = MemoryImage::new(messages);

    let report = manager
        .load_snapshot(&mut Participants::detached(), &mut image)
        .unwrap();

    assert_eq!(report.fragments, 6);
    assert_eq!(image.polls, 3);
}

// =============================================================================
// Retrying offer
// =============================================================================

/// Back-pressured twice then accepted: success after exactly two waits.
#[test]
fn test_offer_succeeds_after_two_waits() {
    let log = MemoryLog::new();
    let mut idle = CountingIdle::default();
    let mut publication = ScriptedPublication::new(
        &[OfferOutcome::BackPressured, OfferOutcome::BackPressured],
        OfferOutcome::Accepted(0),
    );

    let report = retrying_offer(&mut publication, &mut idle, &log, b"record");

    assert!(report.is_delivered());
    assert!(matches!(report, OfferReport::Delivered { attempts: 3, waits: 2, .. }));
    assert_eq!(idle.idles, 2);
    assert_eq!(log.find(Event::SnapshotOfferRetry).len(), 2);
}

/// Always back-pressured: failure after three attempts, no panic.
#[test]
fn test_offer_gives_up_after_three_attempts() {
    let log = MemoryLog::new();
    let mut idle = CountingIdle::default();
    let mut publication = ScriptedPublication::new(&[], OfferOutcome::BackPressured);

    let report = retrying_offer(&mut publication, &mut idle, &log, b"record");

    assert_eq!(report, OfferReport::RetriesExhausted { attempts: OFFER_RETRY_COUNT });
    assert_eq!(publication.offers, 3);
    let error = &log.find(Event::SnapshotOfferExhausted)[0];
    assert_eq!(error.severity, Severity::Error);
    assert!(error.field("reason").unwrap().contains("within 3 retries"));
}

/// Not connected on the first attempt: exactly one attempt, no waiting.
#[test]
fn test_offer_not_connected_aborts_immediately() {
    let log = MemoryLog::new();
    let mut idle = CountingIdle::default();
    let mut publication = ScriptedPublication::new(&[OfferOutcome::NotConnected], OfferOutcome::Accepted(0));

    let report = retrying_offer(&mut publication, &mut idle, &log, b"record");

    assert_eq!(
        report,
        OfferReport::Fatal {
            outcome: OfferOutcome::NotConnected,
            attempts: 1
        }
    );
    assert_eq!(publication.offers, 1);
    assert_eq!(idle.idles, 0);
}

/// A position limit is terminal as well.
#[test]
fn test_offer_max_position_is_terminal() {
    let log = MemoryLog::new();
    let mut idle = CountingIdle::default();
    let mut publication =
        ScriptedPublication::new(&[OfferOutcome::BackPressured, OfferOutcome::MaxPositionExceeded], OfferOutcome::Accepted(0));

    let report = retrying_offer(&mut publication, &mut idle, &log, b"record");

    assert!(matches!(
        report,
        OfferReport::Fatal {
            outcome: OfferOutcome::MaxPositionExceeded,
            attempts: 2
        }
    ));
    assert_eq!(idle.idles, 1);
}

// =============================================================================
// Aborted writes
// =============================================================================

/// A terminal refusal mid-snapshot stops writing, abandons and reports.
#[test]
fn test_fatal_offer_abandons_snapshot() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);
    let source = Participants::with(&[(1, "A"), (2, "B"), (3, "C")]);
    let mut publication = ScriptedPublication::new(
        &[OfferOutcome::Accepted(0), OfferOutcome::NotConnected],
        OfferOutcome::Accepted(0),
    );

    let err = manager.take_snapshot(&source, &mut publication).unwrap_err();

    assert_eq!(err.code(), SnapshotErrorCode::OfferFailed);
    assert_eq!(err.records_written(), 1);
    assert!(!err.is_fatal());
    assert_eq!(publication.offers, 2);
    assert_eq!(publication.accepted.len(), 1);
    assert_eq!(publication.abandoned, 1);
    assert_eq!(log.find(Event::SnapshotAborted)[0].severity, Severity::Error);
    assert_eq!(manager.state(), SnapshotState::Idle);
}

/// Exhausted retries abandon the snapshot the same way.
#[test]
fn test_exhausted_offer_abandons_snapshot() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);
    let source = Participants::with(&[(1, "A")]);
    let mut publication = ScriptedPublication::new(&[], OfferOutcome::AdminAction);

    let err = manager.take_snapshot(&source, &mut publication).unwrap_err();

    assert_eq!(err.records_written(), 0);
    assert_eq!(
        err.offer(),
        Some(&OfferReport::RetriesExhausted { attempts: 3 })
    );
    assert_eq!(publication.abandoned, 1);
    assert_eq!(manager.idle_strategy().idles, 2);
}

/// A snapshot abandoned partway loads back as incomplete.
#[test]
fn test_abandoned_prefix_loads_incomplete() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);
    let source = Participants::with(&[(1, "A"), (2, "B")]);
    let mut publication = ScriptedPublication::new(
        &[OfferOutcome::Accepted(0), OfferOutcome::Closed],
        OfferOutcome::Accepted(0),
    );
    assert!(manager.take_snapshot(&source, &mut publication).is_err());

    let mut image = MemoryImage::new(publication.accepted);
    let report = manager
        .load_snapshot(&mut Participants::detached(), &mut image)
        .unwrap();

    assert_eq!(report.status, LoadStatus::LoadedIncomplete);
    assert_eq!(report.participants_restored, 1);
}

/// The manager is reusable after a failed write.
#[test]
fn test_write_after_failure_succeeds() {
    let log = MemoryLog::new();
    let mut manager = manager(&log);
    let source = Participants::with(&[(1, "A")]);

    let mut refusing = ScriptedPublication::new(&[], OfferOutcome::NotConnected);
    assert!(manager.take_snapshot(&source, &mut refusing).is_err());

    let mut accepting = ScriptedPublication::accepting();
    let summary = manager.take_snapshot(&source, &mut accepting).unwrap();
    assert_eq!(summary.participants_written, 1);
}
