//! Shared fixtures for the integration suites
//!
//! - `Participants`: in-memory participant model that acknowledges adds
//! - `SharedChannel`: session channel recording every reply
//! - `ScriptedPublication`: snapshot publication with scripted outcomes
//! - `MemoryImage`: snapshot image over a list of messages
//! - `CountingIdle`: idle strategy that only counts

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use clustersm::domain::{Participant, ParticipantDomain};
use clustersm::observability::MemoryLog;
use clustersm::protocol::{ClusterResult, Command, Decoded};
use clustersm::responder::{ClusterClientResponder, SessionChannel, SessionResponder};
use clustersm::snapshot::{IdleStrategy, OfferOutcome, SnapshotImage, SnapshotPublication};

// =============================================================================
// Session channel
// =============================================================================

/// Records replies; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct SharedChannel {
    replies: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl SharedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies(&self) -> Vec<Vec<u8>> {
        self.replies.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.replies.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.borrow().is_empty()
    }

    /// Every reply decoded as a `ClusterResult`
    pub fn results(&self) -> Vec<ClusterResult> {
        self.replies
            .borrow()
            .iter()
            .map(|bytes| match ClusterResult::decode(bytes) {
                Ok(Decoded::Message(result)) => result,
                other => panic!("reply is not a cluster result: {:?}", other),
            })
            .collect()
    }
}

impl SessionChannel for SharedChannel {
    fn reply(&mut self, message: &[u8]) {
        self.replies.borrow_mut().push(message.to_vec());
    }
}

// =============================================================================
// Domain model
// =============================================================================

/// Participants in insertion order. Adding or restoring an existing id
/// replaces its name in place.
pub struct Participants {
    entries: Vec<Participant>,
    responder: SessionResponder<Box<dyn SessionChannel>, MemoryLog>,
}

impl Participants {
    /// Model that acknowledges adds on `channel`
    pub fn new(channel: impl SessionChannel + 'static, log: MemoryLog) -> Self {
        let channel: Box<dyn SessionChannel> = Box::new(channel);
        Self {
            entries: Vec::new(),
            responder: SessionResponder::new(channel, log),
        }
    }

    /// Model whose acknowledgements go nowhere observable
    pub fn detached() -> Self {
        Self::new(SharedChannel::new(), MemoryLog::new())
    }

    pub fn with(entries: &[(i64, &str)]) -> Self {
        let mut model = Self::detached();
        for (id, name) in entries {
            model.restore_participant(*id, name);
        }
        model
    }

    pub fn get(&self, participant_id: i64) -> Option<&Participant> {
        self.entries
            .iter()
            .find(|p| p.participant_id == participant_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Listing sorted by id, for order-insensitive comparison
    pub fn sorted(&self) -> Vec<Participant> {
        let mut list = self.entries.clone();
        list.sort_by_key(|p| p.participant_id);
        list
    }

    fn upsert(&mut self, participant_id: i64, name: &str) {
        match self
            .entries
            .iter_mut()
            .find(|p| p.participant_id == participant_id)
        {
            Some(existing) => existing.name = name.to_string(),
            None => self.entries.push(Participant::new(participant_id, name)),
        }
    }
}

impl ParticipantDomain for Participants {
    fn add_participant(&mut self, participant_id: i64, correlation_id: &str, name: &str) {
        self.upsert(participant_id, name);
        self.responder
            .acknowledge_participant_added(participant_id, correlation_id);
    }

    fn participant_list(&self) -> Vec<Participant> {
        self.entries.clone()
    }

    fn restore_participant(&mut self, participant_id: i64, name: &str) {
        self.upsert(participant_id, name);
    }
}

// =============================================================================
// Snapshot publication
// =============================================================================

/// Publication returning scripted outcomes, then `fallback` forever
pub struct ScriptedPublication {
    script: VecDeque<OfferOutcome>,
    fallback: OfferOutcome,
    position: u64,
    pub offers: usize,
    pub accepted: Vec<Vec<u8>>,
    pub abandoned: usize,
}

impl ScriptedPublication {
    pub fn new(script: &[OfferOutcome], fallback: OfferOutcome) -> Self {
        Self {
            script: script.iter().copied().collect(),
            fallback,
            position: 0,
            offers: 0,
            accepted: Vec::new(),
            abandoned: 0,
        }
    }

    /// Publication that accepts everything
    pub fn accepting() -> Self {
        Self::new(&[], OfferOutcome::Accepted(0))
    }
}

impl SnapshotPublication for ScriptedPublication {
    fn offer(&mut self, message: &[u8]) -> OfferOutcome {
        self.offers += 1;
        let outcome = self.script.pop_front().unwrap_or(self.fallback);
        match outcome {
            OfferOutcome::Accepted(_) => {
                self.accepted.push(message.to_vec());
                self.position += message.len() as u64;
                OfferOutcome::Accepted(self.position)
            }
            other => other,
        }
    }

    fn abandon(&mut self) {
        self.abandoned += 1;
    }
}

// =============================================================================
// Snapshot image
// =============================================================================

/// Image over in-memory messages. `empty_polls` polls return nothing
/// before the first message is delivered.
pub struct MemoryImage {
    messages: Vec<Vec<u8>>,
    next: usize,
    empty_polls: usize,
    pub polls: usize,
}

impl MemoryImage {
    pub fn new(messages: Vec<Vec<u8>>) -> Self {
        Self {
            messages,
            next: 0,
            empty_polls: 0,
            polls: 0,
        }
    }

    pub fn with_empty_polls(mut self, empty_polls: usize) -> Self {
        self.empty_polls = empty_polls;
        self
    }
}

impl SnapshotImage for MemoryImage {
    fn poll(&mut self, handler: &mut dyn FnMut(&[u8]), fragment_limit: usize) -> usize {
        self.polls += 1;
        if self.empty_polls > 0 {
            self.empty_polls -= 1;
            return 0;
        }
        let end = (self.next + fragment_limit).min(self.messages.len());
        for message in &self.messages[self.next..end] {
            handler(message);
        }
        let delivered = end - self.next;
        self.next = end;
        delivered
    }

    fn is_end_of_stream(&self) -> bool {
        self.empty_polls == 0 && self.next == self.messages.len()
    }
}

// =============================================================================
// Idle strategy
// =============================================================================

/// Counts calls, never waits
#[derive(Debug, Default)]
pub struct CountingIdle {
    pub idles: usize,
    pub resets: usize,
}

impl IdleStrategy for CountingIdle {
    fn idle(&mut self) {
        self.idles += 1;
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

// =============================================================================
// Encoding helpers
// =============================================================================

pub fn add_command(participant_id: i64, correlation_id: &str, name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    Command::AddParticipant {
        participant_id,
        correlation_id: correlation_id.to_string(),
        name: name.to_string(),
    }
    .encode(&mut out).unwrap();
    out
}

pub fn list_command(correlation_id: &str) -> Vec<u8> {
    let mut out = Vec::new();
    Command::ListParticipants {
        correlation_id: correlation_id.to_string(),
    }
    .encode(&mut out).unwrap();
    out
}
