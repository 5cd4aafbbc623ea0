//! Room membership registry for the realtime gateway.
//!
//! Pure in-memory bookkeeping, no I/O. The registry is owned by the gateway
//! and mutated only from its handlers; it is rebuilt empty on process
//! restart. Entries are removed synchronously on disconnect so presence
//! lists cannot leak.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

/// A connection currently joined to a room.
///
/// `userId` falls back to the connection id when the connection never
/// authenticated (anonymous collaborator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    #[serde(rename = "socketId")]
    pub connection_id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "username")]
    pub display_name: String,
}

impl Participant {
    /// Participant for an unauthenticated connection.
    pub fn anonymous(connection_id: Uuid) -> Self {
        Self {
            connection_id,
            user_id: connection_id.to_string(),
            display_name: "Anónimo".to_string(),
        }
    }
}

/// Mapping of room id to the set of joined participants, keyed by
/// connection id.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, HashMap<Uuid, Participant>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a participant entry, creating the room if needed.
    ///
    /// Returns true when the connection was already in the room (re-join),
    /// in which case the entry is replaced without duplicating.
    pub fn upsert(&mut self, room_id: &str, participant: Participant) -> bool {
        self.rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(participant.connection_id, participant)
            .is_some()
    }

    /// Remove a connection from a room, deleting the room when it empties.
    ///
    /// Returns the removed participant, or None if the connection was not a
    /// member (making double-removal on leave + disconnect a no-op).
    pub fn remove(&mut self, room_id: &str, connection_id: Uuid) -> Option<Participant> {
        let members = self.rooms.get_mut(room_id)?;
        let removed = members.remove(&connection_id);
        if members.is_empty() {
            self.rooms.remove(room_id);
        }
        removed
    }

    /// Current participant list for a room; empty when the room does not
    /// exist.
    pub fn participants(&self, room_id: &str) -> Vec<Participant> {
        self.rooms
            .get(room_id)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether the room currently exists (has at least one member).
    pub fn room_exists(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
