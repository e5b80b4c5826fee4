//! Domain model contract
//!
//! The participant model is owned by the hosting service and mutated only
//! through this layer, on the single processing thread. This crate ships
//! no storage for it; the trait is the whole contract.

use serde::{Deserialize, Serialize};

/// A participant as held by the domain model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: i64,
    pub name: String,
}

impl Participant {
    pub fn new(participant_id: i64, name: impl Into<String>) -> Self {
        Self {
            participant_id,
            name: name.into(),
        }
    }
}

/// Command and query surface of the participant model.
///
/// Implementations must be deterministic: the same calls in the same
/// order leave every replica in the same state and return listings in
/// the same order.
pub trait ParticipantDomain {
    /// Apply an add-participant command. Acknowledging the client is the
    /// model's concern; the correlation id is passed through untouched.
    fn add_participant(&mut self, participant_id: i64, correlation_id: &str, name: &str);

    /// Current participants, in the model's deterministic listing order
    fn participant_list(&self) -> Vec<Participant>;

    /// Restore one participant from a snapshot record. Restoring the same
    /// id twice must leave a single participant.
    fn restore_participant(&mut self, participant_id: i64, name: &str);
}

impl<D: ParticipantDomain + ?Sized> ParticipantDomain for &mut D {
    fn add_participant(&mut self, participant_id: i64, correlation_id: &str, name: &str) {
        (**self).add_participant(participant_id, correlation_id, name);
    }

    fn participant_list(&self) -> Vec<Participant> {
        (**self).participant_list()
    }

    fn restore_participant(&mut self, participant_id: i64, name: &str) {
        (**self).restore_participant(participant_id, name);
    }
}
