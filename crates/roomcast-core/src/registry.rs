//! Room registry.
//!
//! Owns every [`Room`]. One room, the default room, is created with the
//! registry and can never be removed; joins to unknown room IDs land there.
//! All other rooms are created explicitly and removed once their last member
//! leaves. A room a client created but nobody joined is removed when its
//! creator disconnects.

use std::collections::HashMap;

use crate::{ConnectionId, RoomId, room::Room};

/// Mapping from room ID to [`Room`].
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    default_room_id: RoomId,
    default_room_name: String,
    max_history: usize,
}

impl RoomRegistry {
    /// Create a registry containing only the default room.
    pub fn new(
        default_room_id: impl Into<RoomId>,
        default_room_name: impl Into<String>,
        max_history: usize,
    ) -> Self {
        let mut registry = Self {
            rooms: HashMap::new(),
            default_room_id: default_room_id.into(),
            default_room_name: default_room_name.into(),
            max_history,
        };
        registry.ensure_default_room();
        registry
    }

    /// Make sure the default room exists. Idempotent: an existing default
    /// room keeps its members and history.
    pub fn ensure_default_room(&mut self) {
        if !self.rooms.contains_key(&self.default_room_id) {
            let room =
                Room::new(self.default_room_id.clone(), &*self.default_room_name, self.max_history);
            self.rooms.insert(self.default_room_id.clone(), room);
        }
    }

    /// True if `room_id` is the default room.
    pub fn is_default(&self, room_id: &str) -> bool {
        room_id == self.default_room_id
    }

    /// Look up a room.
    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// Look up a room for mutation.
    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    /// Check if a room exists.
    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Room that a join for `requested` should land in: `requested` itself
    /// if it exists, otherwise the default room.
    pub fn resolve(&self, requested: &str) -> RoomId {
        if self.rooms.contains_key(requested) {
            requested.to_string()
        } else {
            self.default_room_id.clone()
        }
    }

    /// Create an empty room.
    ///
    /// Returns `false` if a room with that ID already exists.
    pub fn create_room(&mut self, room_id: impl Into<RoomId>, name: impl Into<String>) -> bool {
        let room_id = room_id.into();
        let room = Room::new(room_id.clone(), name, self.max_history);
        self.insert_new(room_id, room)
    }

    /// Create an empty room on behalf of a connection.
    ///
    /// Returns `false` if a room with that ID already exists.
    pub fn create_room_for(
        &mut self,
        creator: ConnectionId,
        room_id: impl Into<RoomId>,
        name: impl Into<String>,
    ) -> bool {
        let room_id = room_id.into();
        let room = Room::new(room_id.clone(), name, self.max_history).with_creator(creator);
        self.insert_new(room_id, room)
    }

    fn insert_new(&mut self, room_id: RoomId, room: Room) -> bool {
        if self.rooms.contains_key(&room_id) {
            return false;
        }
        self.rooms.insert(room_id, room);
        true
    }

    /// Remove every empty room `creator` created. Returns the removed IDs.
    pub fn remove_abandoned(&mut self, creator: ConnectionId) -> Vec<RoomId> {
        let abandoned: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|room| room.created_by() == Some(creator) && room.is_empty())
            .map(|room| room.id().to_string())
            .collect();

        for room_id in &abandoned {
            self.rooms.remove(room_id);
        }
        abandoned
    }

    /// Remove `room_id` if it is empty and not the default room.
    ///
    /// Returns `true` if the room was removed.
    pub fn delete_if_empty_and_not_default(&mut self, room_id: &str) -> bool {
        if self.is_default(room_id) {
            return false;
        }

        if self.rooms.get(room_id).is_some_and(Room::is_empty) {
            self.rooms.remove(room_id);
            return true;
        }

        false
    }

    /// Number of rooms, including the default room.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// IDs of all rooms, in no particular order.
    pub fn room_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.rooms.keys().map(String::as_str)
    }
}
