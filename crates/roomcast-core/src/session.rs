//! Per-connection session state.
//!
//! A session starts unidentified, gains an identity with `SET_USER`, and
//! enters a room with `JOIN_ROOM`. Leaving a room keeps the identity; closing
//! the connection discards the session from any state.

use crate::RoomId;

/// Identity and room membership of one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Claimed user ID
    pub user_id: Option<String>,
    /// Display name, if one was supplied or derived
    pub user_name: Option<String>,
    /// Room the connection is currently in
    pub current_room: Option<RoomId>,
}

impl Session {
    /// Create a session with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an identity claim. An empty or missing name falls back to the
    /// name derived from `user_id`.
    pub fn identify(&mut self, user_id: impl Into<String>, user_name: Option<String>) {
        let user_id = user_id.into();
        let user_name = user_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| default_user_name(&user_id));
        self.user_id = Some(user_id);
        self.user_name = Some(user_name);
    }

    /// Display name to use for this session, deriving the default from the
    /// user ID when no name is set. `None` before an identity is claimed.
    pub fn display_name(&self) -> Option<String> {
        match (&self.user_name, &self.user_id) {
            (Some(name), _) => Some(name.clone()),
            (None, Some(user_id)) => Some(default_user_name(user_id)),
            (None, None) => None,
        }
    }
}

/// Name shown for a user who did not pick one: `User-` followed by the first
/// five characters of the user ID.
pub fn default_user_name(user_id: &str) -> String {
    let prefix: String = user_id.chars().take(5).collect();
    format!("User-{prefix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_truncates_to_five_chars() {
        assert_eq!(default_user_name("u2222222"), "User-u2222");
        assert_eq!(default_user_name("u1"), "User-u1");
        assert_eq!(default_user_name("héllo wörld"), "User-héllo");
    }

    #[test]
    fn identify_derives_missing_name() {
        let mut session = Session::new();
        session.identify("abcdefgh", None);
        assert_eq!(session.user_name.as_deref(), Some("User-abcde"));

        session.identify("abcdefgh", Some(String::new()));
        assert_eq!(session.user_name.as_deref(), Some("User-abcde"));

        session.identify("abcdefgh", Some("Ann".into()));
        assert_eq!(session.user_name.as_deref(), Some("Ann"));
    }

    #[test]
    fn display_name_is_none_before_identify() {
        let mut session = Session::new();
        assert_eq!(session.display_name(), None);

        session.identify("u1", None);
        assert_eq!(session.display_name().as_deref(), Some("User-u1"));
    }

    #[test]
    fn display_name_derives_when_unset() {
        let session = Session { user_id: Some("zz9plural".into()), ..Session::default() };
        assert_eq!(session.display_name().as_deref(), Some("User-zz9pl"));
    }
}
