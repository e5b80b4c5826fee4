//! Protocol error types
//!
//! Every variant is a *malformed input* condition: the message is
//! dropped and logged, nothing is applied. Unknown templates are not
//! errors at this level (see `Decoded::Unknown`).

use thiserror::Error;

use super::template::TemplateId;

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Wire decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Fewer bytes than one message header
    #[error("message too short: {length} bytes, header requires {required}")]
    ShortMessage { length: usize, required: usize },

    /// Fragment range does not lie within the delivered buffer
    #[error("fragment out of bounds: offset {offset} + length {length} exceeds buffer of {capacity}")]
    OutOfBounds {
        offset: usize,
        length: usize,
        capacity: usize,
    },

    /// Header carries another schema's id
    #[error("schema id {found} does not match expected {expected}")]
    SchemaMismatch { found: u16, expected: u16 },

    /// Root or group block shorter than the fields this node reads from it
    #[error("{template} block length {found} is below required {required}")]
    BlockTooShort {
        template: TemplateId,
        found: u16,
        required: u16,
    },

    /// A field runs past the end of the message
    #[error("truncated {field}: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Var-data string is not valid UTF-8
    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    /// Var-data longer than its u32 length prefix can describe
    #[error("{field} is {length} bytes, over the wire limit of {limit}", limit = u32::MAX)]
    FieldTooLong { field: &'static str, length: usize },

    /// Repeating group with more entries than its u32 count can describe
    #[error("{field} has {count} entries, over the wire limit of {limit}", limit = u32::MAX)]
    GroupTooLarge { field: &'static str, count: usize },
}

impl ProtocolError {
    /// True when the message did not even hold a full header
    pub fn is_short_message(&self) -> bool {
        matches!(self, ProtocolError::ShortMessage { .. })
    }
}
