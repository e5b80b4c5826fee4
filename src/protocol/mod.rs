//! Wire protocol
//!
//! Every message is a fixed header followed by a template-specific body.
//! The header's template id routes the body to exactly one decoder; the
//! typed families in `messages` are the only things the rest of the
//! crate sees.
//!
//! # Malformed input
//!
//! A buffer shorter than the header, a foreign schema id, or a body that
//! runs past the end of the buffer is a `ProtocolError`. Unknown
//! templates are not errors: decoders return `Decoded::Unknown` so the
//! caller can log and move on.

mod codec;
mod errors;
mod header;
mod messages;
mod template;

pub use codec::{GROUP_HEADER_LENGTH, VAR_DATA_LENGTH_PREFIX};
pub use errors::{ProtocolError, ProtocolResult};
pub use header::{fragment, MessageHeader, SCHEMA_ID, SCHEMA_VERSION};
pub use messages::{
    encode_end_of_snapshot, encode_participant_added, encode_participant_list,
    encode_participant_snapshot, ClusterResult, Command, Decoded, SnapshotRecord,
};
pub use template::TemplateId;
