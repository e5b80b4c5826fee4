//! clustersm - message handling layer of a replicated deterministic state machine
//!
//! Bytes delivered by the replicated log become typed commands, typed
//! commands become domain calls, domain results become reply bytes, and
//! domain state is written to and restored from a snapshot channel.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod egress;
pub mod node;
pub mod observability;
pub mod protocol;
pub mod responder;
pub mod snapshot;
