//! Command demultiplexer
//!
//! Routes one replicated-log fragment to exactly one domain operation.
//!
//! # Determinism
//!
//! The outcome depends only on the fragment bytes and the current domain
//! state. No clocks, no randomness, no unordered iteration; every replica
//! applying the same log converges to the same state.
//!
//! # Failure policy
//!
//! Nothing crosses the dispatch boundary. Short or malformed fragments
//! are logged at ERROR and dropped without side effects; unknown
//! templates are logged at WARN and dropped. Either way the log position
//! advances normally.

use std::fmt;

use crate::domain::ParticipantDomain;
use crate::observability::{Event, LogSink};
use crate::protocol::{fragment, Command, Decoded, MessageHeader, ProtocolError, TemplateId};
use crate::responder::ClusterClientResponder;

/// Why a fragment was not applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Fewer bytes than a message header
    ShortMessage,
    /// Header present but the fragment could not be decoded
    Malformed(ProtocolError),
    /// Template id this node does not know
    UnknownTemplate(u16),
    /// Known template that is not a command
    NotACommand(TemplateId),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::ShortMessage => write!(f, "message too short"),
            DropReason::Malformed(err) => write!(f, "malformed: {}", err),
            DropReason::UnknownTemplate(id) => write!(f, "unknown template {}", id),
            DropReason::NotACommand(template) => write!(f, "{} is not a command", template),
        }
    }
}

/// What `dispatch` did with a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Exactly one command was applied
    Applied(TemplateId),
    /// Nothing was applied
    Dropped(DropReason),
}

impl DispatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, DispatchOutcome::Applied(_))
    }
}

/// Demultiplexer from log fragments to domain calls.
///
/// Holds no decode state between calls; each fragment is decoded into
/// locals that die with the call.
pub struct Demuxer<L> {
    log: L,
}

impl<L: LogSink> Demuxer<L> {
    pub fn new(log: L) -> Self {
        Self { log }
    }

    /// Dispatch the `length` bytes at `offset` in `buffer`.
    ///
    /// Correspondence:
    /// - AddParticipant → `domain.add_participant(id, correlation_id, name)`
    /// - ListParticipants → `domain.participant_list()` then
    ///   `responder.return_participant_list(list, correlation_id)`
    pub fn dispatch<D, R>(
        &self,
        domain: &mut D,
        responder: &mut R,
        buffer: &[u8],
        offset: usize,
        length: usize,
    ) -> DispatchOutcome
    where
        D: ParticipantDomain + ?Sized,
        R: ClusterClientResponder + ?Sized,
    {
        match fragment(buffer, offset, length) {
            Ok(message) => self.dispatch_message(domain, responder, message),
            Err(err) => self.reject(err),
        }
    }

    /// Dispatch one complete message
    pub fn dispatch_message<D, R>(
        &self,
        domain: &mut D,
        responder: &mut R,
        message: &[u8],
    ) -> DispatchOutcome
    where
        D: ParticipantDomain + ?Sized,
        R: ClusterClientResponder + ?Sized,
    {
        let command = match Command::decode(message) {
            Ok(Decoded::Message(command)) => command,
            Ok(Decoded::Unknown(header)) => return self.skip(header),
            Err(err) => return self.reject(err),
        };

        let template = command.template();
        match command {
            Command::AddParticipant {
                participant_id,
                correlation_id,
                name,
            } => {
                domain.add_participant(participant_id, &correlation_id, &name);
            }
            Command::ListParticipants { correlation_id } => {
                let participants = domain.participant_list();
                responder.return_participant_list(&participants, &correlation_id);
            }
        }
        DispatchOutcome::Applied(template)
    }

    fn reject(&self, err: ProtocolError) -> DispatchOutcome {
        if err.is_short_message() {
            self.log.error(
                Event::MessageTooShort,
                &[("reason", &err.to_string())],
            );
            return DispatchOutcome::Dropped(DropReason::ShortMessage);
        }
        self.log
            .error(Event::MessageMalformed, &[("reason", &err.to_string())]);
        DispatchOutcome::Dropped(DropReason::Malformed(err))
    }

    fn skip(&self, header: MessageHeader) -> DispatchOutcome {
        let template_id = header.template_id.to_string();
        match header.template() {
            Some(template) => {
                self.log.warn(
                    Event::UnexpectedTemplate,
                    &[("template", template.name()), ("template_id", &template_id)],
                );
                DispatchOutcome::Dropped(DropReason::NotACommand(template))
            }
            None => {
                self.log
                    .warn(Event::UnknownTemplate, &[("template_id", &template_id)]);
                DispatchOutcome::Dropped(DropReason::UnknownTemplate(header.template_id))
            }
        }
    }
}
