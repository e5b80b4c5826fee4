//! Message header
//!
//! Every message, on the log, on a reply channel or on a snapshot
//! channel, starts with exactly one header:
//! - Block Length (u16 LE): root block size of the body
//! - Template Id (u16 LE)
//! - Schema Id (u16 LE)
//! - Version (u16 LE)

use super::errors::{ProtocolError, ProtocolResult};
use super::template::TemplateId;

/// Schema id carried by every message this node reads or writes
pub const SCHEMA_ID: u16 = 1;

/// Schema version written by this node
pub const SCHEMA_VERSION: u16 = 1;

/// Fixed-size message prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub block_length: u16,
    pub template_id: u16,
    pub schema_id: u16,
    pub version: u16,
}

impl MessageHeader {
    /// Encoded size in bytes
    pub const ENCODED_LENGTH: usize = 8;

    /// Header this node writes for `template`
    pub fn for_template(template: TemplateId) -> Self {
        Self {
            block_length: template.block_length(),
            template_id: template.as_u16(),
            schema_id: SCHEMA_ID,
            version: SCHEMA_VERSION,
        }
    }

    /// Append the encoded header to `out`
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.block_length.to_le_bytes());
        out.extend_from_slice(&self.template_id.to_le_bytes());
        out.extend_from_slice(&self.schema_id.to_le_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
    }

    /// Read the header at the start of `buffer`.
    ///
    /// Fails with `ShortMessage` when fewer than `ENCODED_LENGTH` bytes
    /// are present. The schema id is not checked here; see `validate_schema`.
    pub fn decode(buffer: &[u8]) -> ProtocolResult<Self> {
        if buffer.len() < Self::ENCODED_LENGTH {
            return Err(ProtocolError::ShortMessage {
                length: buffer.len(),
                required: Self::ENCODED_LENGTH,
            });
        }
        let field = |at: usize| u16::from_le_bytes([buffer[at], buffer[at + 1]]);
        Ok(Self {
            block_length: field(0),
            template_id: field(2),
            schema_id: field(4),
            version: field(6),
        })
    }

    /// Reject headers that belong to another schema
    pub fn validate_schema(&self) -> ProtocolResult<()> {
        if self.schema_id != SCHEMA_ID {
            return Err(ProtocolError::SchemaMismatch {
                found: self.schema_id,
                expected: SCHEMA_ID,
            });
        }
        Ok(())
    }

    /// The known template, if any
    pub fn template(&self) -> Option<TemplateId> {
        TemplateId::from_u16(self.template_id)
    }
}

/// Slice `length` bytes at `offset` out of `buffer`, as delivered by a
/// `(buffer, offset, length)` fragment callback.
pub fn fragment(buffer: &[u8], offset: usize, length: usize) -> ProtocolResult<&[u8]> {
    offset
        .checked_add(length)
        .and_then(|end| buffer.get(offset..end))
        .ok_or(ProtocolError::OutOfBounds {
            offset,
            length,
            capacity: buffer.len(),
        })
}
