//! A chat room: members plus recent history.

use std::collections::BTreeMap;

use roomcast_proto::{ChatMessage, UserSummary};

use crate::{ConnectionId, RoomId, history::MessageStore};

/// Identity a connection had when it joined a room.
///
/// Captured at join time; later identity changes on the session do not
/// rewrite it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// User ID at join time
    pub user_id: String,
    /// Display name at join time
    pub user_name: String,
}

/// A named set of member connections and their recent messages.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    name: String,
    /// Keyed by connection so listings come out in a stable order
    members: BTreeMap<ConnectionId, Member>,
    history: MessageStore,
    /// Connection that created the room on request, `None` for configured rooms
    created_by: Option<ConnectionId>,
}

impl Room {
    /// Create an empty room.
    pub fn new(id: impl Into<RoomId>, name: impl Into<String>, max_history: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            members: BTreeMap::new(),
            history: MessageStore::new(max_history),
            created_by: None,
        }
    }

    /// Record the connection that asked for this room.
    #[must_use]
    pub fn with_creator(mut self, connection: ConnectionId) -> Self {
        self.created_by = Some(connection);
        self
    }

    /// Connection that created the room, if a client did.
    pub fn created_by(&self) -> Option<ConnectionId> {
        self.created_by
    }

    /// Room ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, fixed at creation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a connection. Returns the previous record if the connection
    /// was already a member.
    pub fn add_member(&mut self, connection: ConnectionId, member: Member) -> Option<Member> {
        self.members.insert(connection, member)
    }

    /// Remove a connection, returning its member record.
    pub fn remove_member(&mut self, connection: ConnectionId) -> Option<Member> {
        self.members.remove(&connection)
    }

    /// Member record for a connection.
    pub fn member(&self, connection: ConnectionId) -> Option<&Member> {
        self.members.get(&connection)
    }

    /// Connections currently in the room.
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.members.keys().copied()
    }

    /// Number of members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// True if nobody is in the room.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member listing for `ROOM_USERS`.
    pub fn user_summaries(&self) -> Vec<UserSummary> {
        self.members
            .values()
            .map(|m| UserSummary { id: m.user_id.clone(), name: m.user_name.clone() })
            .collect()
    }

    /// Append a message to the history, returning whatever got evicted.
    pub fn append(&mut self, message: ChatMessage) -> Option<ChatMessage> {
        self.history.push(message)
    }

    /// Recent messages.
    pub fn history(&self) -> &MessageStore {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> Member {
        Member { user_id: id.into(), user_name: format!("User-{id}") }
    }

    #[test]
    fn add_and_remove_members() {
        let mut room = Room::new("lobby", "Lobby", 10);
        assert!(room.is_empty());

        assert!(room.add_member(1, member("a")).is_none());
        assert!(room.add_member(2, member("b")).is_none());
        assert_eq!(room.member_count(), 2);
        assert!(room.member(1).is_some());

        let removed = room.remove_member(1).unwrap();
        assert_eq!(removed.user_id, "a");
        assert!(room.member(1).is_none());
        assert!(room.remove_member(1).is_none());
    }

    #[test]
    fn creator_is_recorded() {
        assert_eq!(Room::new("lobby", "Lobby", 10).created_by(), None);
        assert_eq!(Room::new("lobby", "Lobby", 10).with_creator(4).created_by(), Some(4));
    }

    #[test]
    fn re_adding_replaces_record() {
        let mut room = Room::new("lobby", "Lobby", 10);
        room.add_member(1, member("a"));
        let previous = room.add_member(1, member("z")).unwrap();
        assert_eq!(previous.user_id, "a");
        assert_eq!(room.member_count(), 1);
        assert_eq!(room.member(1).unwrap().user_id, "z");
    }

    #[test]
    fn summaries_are_ordered_by_connection() {
        let mut room = Room::new("lobby", "Lobby", 10);
        room.add_member(7, member("late"));
        room.add_member(3, member("early"));
        let ids: Vec<_> = room.user_summaries().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }
}
