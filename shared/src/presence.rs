use std::collections::BTreeMap;

use crate::error::{SessionError, SessionResult};
use crate::protocol::ParticipantWire;
use crate::seat::ParticipantId;

/// What consumers get back when resolving a participant id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantHandle {
    pub id: ParticipantId,
    pub name: String,
}

/// Session-membership boundary: host authority and identity lookup.
pub trait PresenceBridge {
    fn is_host(&self) -> bool;

    /// `UnknownParticipant` is transient; retry on the next state refresh.
    fn resolve_participant(&self, id: ParticipantId) -> SessionResult<ParticipantHandle>;
}

/// Known participants, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: BTreeMap<ParticipantId, ParticipantHandle>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_wire(participants: &[ParticipantWire]) -> Self {
        let entries = participants
            .iter()
            .map(|p| {
                (
                    p.id,
                    ParticipantHandle {
                        id: p.id,
                        name: p.name.clone(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, handle: ParticipantHandle) {
        self.entries.insert(handle.id, handle);
    }

    pub fn remove(&mut self, id: ParticipantId) -> Option<ParticipantHandle> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn resolve(&self, id: ParticipantId) -> SessionResult<ParticipantHandle> {
        self.entries
            .get(&id)
            .cloned()
            .ok_or(SessionError::UnknownParticipant(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_wire(&self) -> Vec<ParticipantWire> {
        self.entries
            .values()
            .map(|h| ParticipantWire {
                id: h.id,
                name: h.name.clone(),
            })
            .collect()
    }
}
