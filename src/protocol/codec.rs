//! Field-level encoding primitives
//!
//! Body layout after the header:
//! - Root block: fixed-size fields, `block_length` bytes
//! - Repeating groups: `block_length` (u16 LE), `num_in_group` (u32 LE),
//!   then each entry's fixed block followed by its var data
//! - Var data: length (u32 LE) + UTF-8 bytes
//!
//! Readers honour the block lengths found on the wire, so a sender with
//! a larger block than this node knows still decodes.

use super::errors::{ProtocolError, ProtocolResult};
use super::header::MessageHeader;
use super::template::TemplateId;

/// Encoded size of a repeating group header
pub const GROUP_HEADER_LENGTH: usize = 6;

/// Encoded size of a var-data length prefix
pub const VAR_DATA_LENGTH_PREFIX: usize = 4;

pub(crate) fn put_i64(out: &mut Vec<u8>, value: i64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Append a var-data string. Lengths are u32 on the wire; anything
/// longer is rejected before a byte is written.
pub(crate) fn put_var_string(
    out: &mut Vec<u8>,
    field: &'static str,
    value: &str,
) -> ProtocolResult<()> {
    let length = var_data_length(field, value.len())?;
    out.extend_from_slice(&length.to_le_bytes());
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

pub(crate) fn put_group_header(
    out: &mut Vec<u8>,
    field: &'static str,
    block_length: u16,
    count: usize,
) -> ProtocolResult<()> {
    let count = group_count(field, count)?;
    out.extend_from_slice(&block_length.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    Ok(())
}

fn var_data_length(field: &'static str, length: usize) -> ProtocolResult<u32> {
    u32::try_from(length).map_err(|_| ProtocolError::FieldTooLong { field, length })
}

fn group_count(field: &'static str, count: usize) -> ProtocolResult<u32> {
    u32::try_from(count).map_err(|_| ProtocolError::GroupTooLarge { field, count })
}

/// Bounds-checked cursor over one message
pub(crate) struct MessageReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> MessageReader<'a> {
    /// Position a reader on the root block of a message whose header has
    /// already been decoded. Rejects root blocks smaller than `template` needs.
    pub(crate) fn body(
        buffer: &'a [u8],
        header: &MessageHeader,
        template: TemplateId,
    ) -> ProtocolResult<Self> {
        if header.block_length < template.block_length() {
            return Err(ProtocolError::BlockTooShort {
                template,
                found: header.block_length,
                required: template.block_length(),
            });
        }
        Ok(Self {
            buffer,
            position: MessageHeader::ENCODED_LENGTH,
        })
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    fn take(&mut self, field: &'static str, needed: usize) -> ProtocolResult<&'a [u8]> {
        let available = self.buffer.len().saturating_sub(self.position);
        if needed > available {
            return Err(ProtocolError::Truncated {
                field,
                offset: self.position,
                needed,
                available,
            });
        }
        let bytes = &self.buffer[self.position..self.position + needed];
        self.position += needed;
        Ok(bytes)
    }

    /// Move to an absolute position, which must lie within the message
    pub(crate) fn seek(&mut self, field: &'static str, position: usize) -> ProtocolResult<()> {
        if position > self.buffer.len() {
            return Err(ProtocolError::Truncated {
                field,
                offset: self.position,
                needed: position.saturating_sub(self.position),
                available: self.buffer.len().saturating_sub(self.position),
            });
        }
        self.position = position;
        Ok(())
    }

    /// Skip to the end of the root block declared in the header
    pub(crate) fn end_root_block(&mut self, header: &MessageHeader) -> ProtocolResult<()> {
        self.seek(
            "root block",
            MessageHeader::ENCODED_LENGTH + header.block_length as usize,
        )
    }

    pub(crate) fn read_u16(&mut self, field: &'static str) -> ProtocolResult<u16> {
        let bytes = self.take(field, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32(&mut self, field: &'static str) -> ProtocolResult<u32> {
        let bytes = self.take(field, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_i64(&mut self, field: &'static str) -> ProtocolResult<i64> {
        let bytes = self.take(field, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(raw))
    }

    pub(crate) fn read_var_string(&mut self, field: &'static str) -> ProtocolResult<String> {
        let len = self.read_u32(field)? as usize;
        let bytes = self.take(field, len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8 { field })
    }

    /// Read a group header, returning `(block_length, count)`.
    ///
    /// The count is checked against the bytes left so a corrupt count
    /// cannot drive a huge allocation.
    pub(crate) fn read_group_header(
        &mut self,
        field: &'static str,
        min_block_length: u16,
        template: TemplateId,
    ) -> ProtocolResult<(u16, usize)> {
        let block_length = self.read_u16(field)?;
        let count = self.read_u32(field)? as usize;
        if block_length < min_block_length {
            return Err(ProtocolError::BlockTooShort {
                template,
                found: block_length,
                required: min_block_length,
            });
        }
        let min_entry = block_length as usize + VAR_DATA_LENGTH_PREFIX;
        let available = self.buffer.len().saturating_sub(self.position);
        let needed = count.saturating_mul(min_entry);
        if needed > available {
            return Err(ProtocolError::Truncated {
                field,
                offset: self.position,
                needed,
                available,
            });
        }
        Ok((block_length, count))
    }
}
