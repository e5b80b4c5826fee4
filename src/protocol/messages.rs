//! Typed messages
//!
//! Three closed families, one per channel:
//! - `Command`: inbound on the replicated log
//! - `ClusterResult`: outbound to client sessions
//! - `SnapshotRecord`: on the snapshot channel
//!
//! `decode` returns `Decoded::Unknown` for any template outside the
//! family, carrying the header so callers can log the template id.

use serde::Serialize;

use super::codec::{put_group_header, put_i64, put_var_string, MessageReader};
use super::errors::ProtocolResult;
use super::header::MessageHeader;
use super::template::TemplateId;
use crate::domain::Participant;

/// Block length of one participant list entry
const PARTICIPANT_ENTRY_BLOCK_LENGTH: u16 = 8;

/// Outcome of decoding one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<T> {
    /// A message of the requested family
    Message(T),
    /// Some other template, known to the node or not
    Unknown(MessageHeader),
}

/// Decode and validate the header, returning it with its known template
fn open(buffer: &[u8]) -> ProtocolResult<(MessageHeader, Option<TemplateId>)> {
    let header = MessageHeader::decode(buffer)?;
    header.validate_schema()?;
    Ok((header, header.template()))
}

/// Commands delivered by the replicated log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    AddParticipant {
        participant_id: i64,
        correlation_id: String,
        name: String,
    },
    ListParticipants {
        correlation_id: String,
    },
}

impl Command {
    pub fn template(&self) -> TemplateId {
        match self {
            Command::AddParticipant { .. } => TemplateId::AddParticipantCommand,
            Command::ListParticipants { .. } => TemplateId::ListParticipantsCommand,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Command::AddParticipant { correlation_id, .. }
            | Command::ListParticipants { correlation_id } => correlation_id,
        }
    }

    /// Append header and body to `out`. On error `out` may hold a
    /// partial message.
    pub fn encode(&self, out: &mut Vec<u8>) -> ProtocolResult<()> {
        MessageHeader::for_template(self.template()).encode(out);
        match self {
            Command::AddParticipant {
                participant_id,
                correlation_id,
                name,
            } => {
                put_i64(out, *participant_id);
                put_var_string(out, "correlation_id", correlation_id)?;
                put_var_string(out, "name", name)
            }
            Command::ListParticipants { correlation_id } => {
                put_var_string(out, "correlation_id", correlation_id)
            }
        }
    }

    pub fn decode(buffer: &[u8]) -> ProtocolResult<Decoded<Self>> {
        let (header, template) = open(buffer)?;
        let command = match template {
            Some(template @ TemplateId::AddParticipantCommand) => {
                let mut reader = MessageReader::body(buffer, &header, template)?;
                let participant_id = reader.read_i64("participant_id")?;
                reader.end_root_block(&header)?;
                let correlation_id = reader.read_var_string("correlation_id")?;
                let name = reader.read_var_string("name")?;
                Command::AddParticipant {
                    participant_id,
                    correlation_id,
                    name,
                }
            }
            Some(template @ TemplateId::ListParticipantsCommand) => {
                let mut reader = MessageReader::body(buffer, &header, template)?;
                reader.end_root_block(&header)?;
                let correlation_id = reader.read_var_string("correlation_id")?;
                Command::ListParticipants { correlation_id }
            }
            _ => return Ok(Decoded::Unknown(header)),
        };
        Ok(Decoded::Message(command))
    }
}

/// Replies sent back to the originating client session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClusterResult {
    ParticipantAdded {
        correlation_id: String,
        participant_id: i64,
    },
    ParticipantList {
        correlation_id: String,
        participants: Vec<Participant>,
    },
}

impl ClusterResult {
    pub fn template(&self) -> TemplateId {
        match self {
            ClusterResult::ParticipantAdded { .. } => TemplateId::AddParticipantCommandResult,
            ClusterResult::ParticipantList { .. } => TemplateId::ParticipantList,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            ClusterResult::ParticipantAdded { correlation_id, .. }
            | ClusterResult::ParticipantList { correlation_id, .. } => correlation_id,
        }
    }

    /// Append header and body to `out`
    pub fn encode(&self, out: &mut Vec<u8>) -> ProtocolResult<()> {
        match self {
            ClusterResult::ParticipantAdded {
                correlation_id,
                participant_id,
            } => encode_participant_added(out, *participant_id, correlation_id),
            ClusterResult::ParticipantList {
                correlation_id,
                participants,
            } => encode_participant_list(out, participants, correlation_id),
        }
    }

    pub fn decode(buffer: &[u8]) -> ProtocolResult<Decoded<Self>> {
        let (header, template) = open(buffer)?;
        let result = match template {
            Some(template @ TemplateId::AddParticipantCommandResult) => {
                let mut reader = MessageReader::body(buffer, &header, template)?;
                let participant_id = reader.read_i64("participant_id")?;
                reader.end_root_block(&header)?;
                let correlation_id = reader.read_var_string("correlation_id")?;
                ClusterResult::ParticipantAdded {
                    correlation_id,
                    participant_id,
                }
            }
            Some(template @ TemplateId::ParticipantList) => {
                let mut reader = MessageReader::body(buffer, &header, template)?;
                reader.end_root_block(&header)?;
                let (block_length, count) = reader.read_group_header(
                    "participants",
                    PARTICIPANT_ENTRY_BLOCK_LENGTH,
                    template,
                )?;
                let mut participants = Vec::with_capacity(count);
                for _ in 0..count {
                    let entry_start = reader.position();
                    let participant_id = reader.read_i64("participants.participant_id")?;
                    reader.seek("participants", entry_start + block_length as usize)?;
                    let name = reader.read_var_string("participants.name")?;
                    participants.push(Participant {
                        participant_id,
                        name,
                    });
                }
                let correlation_id = reader.read_var_string("correlation_id")?;
                ClusterResult::ParticipantList {
                    correlation_id,
                    participants,
                }
            }
            _ => return Ok(Decoded::Unknown(header)),
        };
        Ok(Decoded::Message(result))
    }
}

/// Encode an add-participant acknowledgement without building a `ClusterResult`
pub fn encode_participant_added(
    out: &mut Vec<u8>,
    participant_id: i64,
    correlation_id: &str,
) -> ProtocolResult<()> {
    MessageHeader::for_template(TemplateId::AddParticipantCommandResult).encode(out);
    put_i64(out, participant_id);
    put_var_string(out, "correlation_id", correlation_id)
}

/// Encode a participant listing from a borrowed slice. Entry order is
/// preserved; an empty slice yields a well-formed zero-entry listing.
pub fn encode_participant_list(
    out: &mut Vec<u8>,
    participants: &[Participant],
    correlation_id: &str,
) -> ProtocolResult<()> {
    MessageHeader::for_template(TemplateId::ParticipantList).encode(out);
    put_group_header(
        out,
        "participants",
        PARTICIPANT_ENTRY_BLOCK_LENGTH,
        participants.len(),
    )?;
    for participant in participants {
        put_i64(out, participant.participant_id);
        put_var_string(out, "participants.name", &participant.name)?;
    }
    put_var_string(out, "correlation_id", correlation_id)
}

/// Records on the snapshot channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SnapshotRecord {
    Participant { participant_id: i64, name: String },
    EndOfSnapshot,
}

impl SnapshotRecord {
    pub fn template(&self) -> TemplateId {
        match self {
            SnapshotRecord::Participant { .. } => TemplateId::ParticipantSnapshot,
            SnapshotRecord::EndOfSnapshot => TemplateId::EndOfSnapshot,
        }
    }

    /// Append header and body to `out`
    pub fn encode(&self, out: &mut Vec<u8>) -> ProtocolResult<()> {
        match self {
            SnapshotRecord::Participant {
                participant_id,
                name,
            } => encode_participant_snapshot(out, *participant_id, name),
            SnapshotRecord::EndOfSnapshot => {
                encode_end_of_snapshot(out);
                Ok(())
            }
        }
    }

    pub fn decode(buffer: &[u8]) -> ProtocolResult<Decoded<Self>> {
        let (header, template) = open(buffer)?;
        let record = match template {
            Some(template @ TemplateId::ParticipantSnapshot) => {
                let mut reader = MessageReader::body(buffer, &header, template)?;
                let participant_id = reader.read_i64("participant_id")?;
                reader.end_root_block(&header)?;
                let name = reader.read_var_string("name")?;
                SnapshotRecord::Participant {
                    participant_id,
                    name,
                }
            }
            Some(TemplateId::EndOfSnapshot) => SnapshotRecord::EndOfSnapshot,
            _ => return Ok(Decoded::Unknown(header)),
        };
        Ok(Decoded::Message(record))
    }
}

/// Encode one participant snapshot record from borrowed fields
pub fn encode_participant_snapshot(
    out: &mut Vec<u8>,
    participant_id: i64,
    name: &str,
) -> ProtocolResult<()> {
    MessageHeader::for_template(TemplateId::ParticipantSnapshot).encode(out);
    put_i64(out, participant_id);
    put_var_string(out, "name", name)
}

/// Encode the end-of-snapshot marker. Header only, so it cannot fail.
pub fn encode_end_of_snapshot(out: &mut Vec<u8>) {
    MessageHeader::for_template(TemplateId::EndOfSnapshot).encode(out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ProtocolError;

    fn encoded<F: Fn(&mut Vec<u8>) -> ProtocolResult<()>>(f: F) -> Vec<u8> {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        out
    }

    #[test]
    fn test_add_participant_layout() {
        let command = Command::AddParticipant {
            participant_id: 7,
            correlation_id: "c1".to_string(),
            name: "Ann".to_string(),
        };
        let bytes = encoded(|out| command.encode(out));

        let header = MessageHeader::decode(&bytes).unwrap();
        assert_eq!(header.template(), Some(TemplateId::AddParticipantCommand));
        assert_eq!(header.block_length, 8);
        // header + id + (4 + 2) + (4 + 3)
        assert_eq!(bytes.len(), 8 + 8 + 6 + 7);
        assert_eq!(Command::decode(&bytes).unwrap(), Decoded::Message(command));
    }

    #[test]
    fn test_participant_list_preserves_order_and_empty() {
        let empty = ClusterResult::ParticipantList {
            correlation_id: "none".to_string(),
            participants: vec![],
        };
        let bytes = encoded(|out| empty.encode(out));
        assert_eq!(ClusterResult::decode(&bytes).unwrap(), Decoded::Message(empty));

        let three = ClusterResult::ParticipantList {
            correlation_id: "list".to_string(),
            participants: vec![
                Participant::new(3, "C"),
                Participant::new(1, "A"),
                Participant::new(2, "B"),
            ],
        };
        let bytes = encoded(|out| three.encode(out));
        assert_eq!(ClusterResult::decode(&bytes).unwrap(), Decoded::Message(three));
    }

    #[test]
    fn test_larger_root_block_from_newer_sender() {
        // A newer sender appends a 4-byte field to the root block.
        let mut bytes = Vec::new();
        MessageHeader {
            block_length: 12,
            ..MessageHeader::for_template(TemplateId::ParticipantSnapshot)
        }
        .encode(&mut bytes);
        put_i64(&mut bytes, 42);
        bytes.extend_from_slice(&[9, 9, 9, 9]);
        put_var_string(&mut bytes, "name", "later").unwrap();

        assert_eq!(
            SnapshotRecord::decode(&bytes).unwrap(),
            Decoded::Message(SnapshotRecord::Participant {
                participant_id: 42,
                name: "later".to_string()
            })
        );
    }

    #[test]
    fn test_other_family_is_unknown() {
        let bytes = encoded(|out| SnapshotRecord::EndOfSnapshot.encode(out));
        match Command::decode(&bytes).unwrap() {
            Decoded::Unknown(header) => {
                assert_eq!(header.template(), Some(TemplateId::EndOfSnapshot))
            }
            other => panic!("expected unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_name_is_error() {
        let mut bytes = encoded(|out| encode_participant_snapshot(out, 1, "Alice"));
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            SnapshotRecord::decode(&bytes),
            Err(ProtocolError::Truncated { field: "name", .. })
        ));
    }

    #[test]
    fn test_schema_mismatch_is_error() {
        let mut bytes = encoded(|out| SnapshotRecord::EndOfSnapshot.encode(out));
        bytes[4] = 0x2a;
        assert!(matches!(
            SnapshotRecord::decode(&bytes),
            Err(ProtocolError::SchemaMismatch { found: 0x2a, .. })
        ));
    }

    #[test]
    fn test_end_of_snapshot_is_header_only() {
        let bytes = encoded(|out| SnapshotRecord::EndOfSnapshot.encode(out));
        assert_eq!(bytes.len(), MessageHeader::ENCODED_LENGTH);
    }
}
