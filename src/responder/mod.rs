//! Client responder
//!
//! Encodes domain results into reply messages and hands each one to the
//! session channel in a single call. Delivery failures belong to the
//! transport; the responder neither retries nor buffers past that call.

use crate::domain::Participant;
use crate::observability::{Event, LogSink};
use crate::protocol::{
    encode_participant_added, encode_participant_list, ProtocolResult, TemplateId,
};

/// Default initial capacity of the scratch encode buffer
pub const DEFAULT_REPLY_BUFFER_CAPACITY: usize = 1024;

/// Reply path to the session that sent the command being processed
pub trait SessionChannel {
    /// Deliver one complete encoded message. No outcome is reported back.
    fn reply(&mut self, message: &[u8]);
}

impl<C: SessionChannel + ?Sized> SessionChannel for &mut C {
    fn reply(&mut self, message: &[u8]) {
        (**self).reply(message);
    }
}

impl<C: SessionChannel + ?Sized> SessionChannel for Box<C> {
    fn reply(&mut self, message: &[u8]) {
        (**self).reply(message);
    }
}

/// Result operations the domain and the demultiplexer reply through
pub trait ClusterClientResponder {
    /// Acknowledge that a participant was added, echoing the client's correlation id
    fn acknowledge_participant_added(&mut self, participant_id: i64, correlation_id: &str);

    /// Return the participant listing in the given order
    fn return_participant_list(&mut self, participants: &[Participant], correlation_id: &str);
}

impl<R: ClusterClientResponder + ?Sized> ClusterClientResponder for &mut R {
    fn acknowledge_participant_added(&mut self, participant_id: i64, correlation_id: &str) {
        (**self).acknowledge_participant_added(participant_id, correlation_id);
    }

    fn return_participant_list(&mut self, participants: &[Participant], correlation_id: &str) {
        (**self).return_participant_list(participants, correlation_id);
    }
}

/// Responder that encodes into a reusable scratch buffer and replies on a
/// `SessionChannel`.
///
/// The scratch buffer is cleared before every message and grows to fit;
/// reuse only saves allocations and never shows in the output.
pub struct SessionResponder<C, L> {
    channel: C,
    log: L,
    scratch: Vec<u8>,
}

impl<C: SessionChannel, L: LogSink> SessionResponder<C, L> {
    pub fn new(channel: C, log: L) -> Self {
        Self::with_capacity(channel, log, DEFAULT_REPLY_BUFFER_CAPACITY)
    }

    pub fn with_capacity(channel: C, log: L, capacity: usize) -> Self {
        Self {
            channel,
            log,
            scratch: Vec::with_capacity(capacity),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Reply with the scratch buffer, or log and drop a reply whose
    /// fields exceed the wire limits
    fn send(&mut self, template: TemplateId, encoded: ProtocolResult<()>) {
        if let Err(err) = encoded {
            self.log.error(
                Event::ReplyEncodeFailed,
                &[("reason", &err.to_string()), ("template", template.name())],
            );
            return;
        }
        self.channel.reply(&self.scratch);
        self.log.trace(
            Event::ReplySent,
            &[
                ("length", &self.scratch.len().to_string()),
                ("template", template.name()),
            ],
        );
    }
}

impl<C: SessionChannel, L: LogSink> ClusterClientResponder for SessionResponder<C, L> {
    fn acknowledge_participant_added(&mut self, participant_id: i64, correlation_id: &str) {
        self.scratch.clear();
        let encoded = encode_participant_added(&mut self.scratch, participant_id, correlation_id);
        self.send(TemplateId::AddParticipantCommandResult, encoded);
    }

    fn return_participant_list(&mut self, participants: &[Participant], correlation_id: &str) {
        self.scratch.clear();
        let encoded = encode_participant_list(&mut self.scratch, participants, correlation_id);
        self.send(TemplateId::ParticipantList, encoded);
    }
}
