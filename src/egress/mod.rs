//! Client-side reply handling
//!
//! Decodes replies arriving on a client's egress, settles the matching
//! pending request and reports the result to the operator log.

use crate::observability::{Event, LogSink};
use crate::protocol::{fragment, ClusterResult, Decoded, ProtocolError};

/// Requests the client is still waiting on, keyed by correlation id
pub trait PendingRequests {
    /// A reply carrying `correlation_id` arrived
    fn mark_received(&mut self, correlation_id: &str);
}

impl<P: PendingRequests + ?Sized> PendingRequests for &mut P {
    fn mark_received(&mut self, correlation_id: &str) {
        (**self).mark_received(correlation_id);
    }
}

/// What the listener did with one egress message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EgressOutcome {
    /// A result was decoded and its request marked received
    Received(ClusterResult),
    /// The message was logged and dropped
    Ignored,
}

/// Egress listener for an administrative client
pub struct EgressListener<P, L> {
    pending: P,
    log: L,
}

impl<P: PendingRequests, L: LogSink> EgressListener<P, L> {
    pub fn new(pending: P, log: L) -> Self {
        Self { pending, log }
    }

    pub fn pending(&self) -> &P {
        &self.pending
    }

    pub fn on_message(&mut self, buffer: &[u8], offset: usize, length: usize) -> EgressOutcome {
        let message = match fragment(buffer, offset, length) {
            Ok(message) => message,
            Err(err) => return self.malformed(err),
        };

        let result = match ClusterResult::decode(message) {
            Ok(Decoded::Message(result)) => result,
            Ok(Decoded::Unknown(header)) => {
                self.log.warn(
                    Event::EgressUnknownMessage,
                    &[("template_id", &header.template_id.to_string())],
                );
                return EgressOutcome::Ignored;
            }
            Err(err) => return self.malformed(err),
        };

        match &result {
            ClusterResult::ParticipantAdded {
                correlation_id,
                participant_id,
            } => {
                self.log.info(
                    Event::EgressParticipantAdded,
                    &[
                        ("correlation_id", correlation_id),
                        ("participant_id", &participant_id.to_string()),
                    ],
                );
            }
            ClusterResult::ParticipantList { participants, .. } => {
                if participants.is_empty() {
                    self.log.info(
                        Event::EgressNoParticipants,
                        &[("message", "no participants exist in the cluster")],
                    );
                } else {
                    self.log.info(
                        Event::EgressParticipantCount,
                        &[("count", &participants.len().to_string())],
                    );
                    for participant in participants {
                        self.log.info(
                            Event::EgressParticipant,
                            &[
                                ("name", &participant.name),
                                ("participant_id", &participant.participant_id.to_string()),
                            ],
                        );
                    }
                }
            }
        }

        self.pending.mark_received(result.correlation_id());
        EgressOutcome::Received(result)
    }

    fn malformed(&self, err: ProtocolError) -> EgressOutcome {
        let reason = if err.is_short_message() {
            "message too short".to_string()
        } else {
            err.to_string()
        };
        self.log.warn(Event::EgressMalformed, &[("reason", &reason)]);
        EgressOutcome::Ignored
    }
}
