//! Template identifiers
//!
//! The template id in the message header selects the body layout. The
//! set is closed: anything else is an unknown template and is dropped by
//! whichever reader meets it.

use std::fmt;

/// Known message templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TemplateId {
    /// Client command: add a participant
    AddParticipantCommand = 1,
    /// Client command: list all participants
    ListParticipantsCommand = 2,
    /// Reply: participant added
    AddParticipantCommandResult = 10,
    /// Reply: participant listing
    ParticipantList = 11,
    /// Snapshot record: one participant
    ParticipantSnapshot = 100,
    /// Snapshot record: terminal marker
    EndOfSnapshot = 101,
}

impl TemplateId {
    /// Convert from the wire value, returns None for unknown templates
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(TemplateId::AddParticipantCommand),
            2 => Some(TemplateId::ListParticipantsCommand),
            10 => Some(TemplateId::AddParticipantCommandResult),
            11 => Some(TemplateId::ParticipantList),
            100 => Some(TemplateId::ParticipantSnapshot),
            101 => Some(TemplateId::EndOfSnapshot),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Root block length this node writes, and the minimum it accepts
    pub fn block_length(self) -> u16 {
        match self {
            TemplateId::AddParticipantCommand
            | TemplateId::AddParticipantCommandResult
            | TemplateId::ParticipantSnapshot => 8,
            TemplateId::ListParticipantsCommand
            | TemplateId::ParticipantList
            | TemplateId::EndOfSnapshot => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TemplateId::AddParticipantCommand => "AddParticipantCommand",
            TemplateId::ListParticipantsCommand => "ListParticipantsCommand",
            TemplateId::AddParticipantCommandResult => "AddParticipantCommandResult",
            TemplateId::ParticipantList => "ParticipantList",
            TemplateId::ParticipantSnapshot => "ParticipantSnapshot",
            TemplateId::EndOfSnapshot => "EndOfSnapshot",
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
