//! Payloads sent by the relay.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::chat::ChatMessage;

/// Confirmation of an identity claim (`USER_SET`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSet {
    /// Resolved user ID
    pub user_id: String,
    /// Resolved display name
    pub user_name: String,
}

/// Confirmation of a join (`ROOM_JOINED`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoined {
    /// Room actually joined (the default room on fallback)
    pub room_id: String,
    /// Room display name
    pub name: String,
}

/// One entry of a member listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User ID
    pub id: String,
    /// Display name
    pub name: String,
}

/// Current member listing (`ROOM_USERS`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUsers {
    /// All members, including the recipient
    pub users: Vec<UserSummary>,
}

/// Recent history replay (`MESSAGE_HISTORY`), oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHistory {
    /// Retained messages
    pub messages: Vec<ChatMessage>,
}

/// Member arrival or departure (`USER_JOINED` / `USER_LEFT`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    /// User ID of the member
    pub user_id: String,
    /// Display name of the member
    pub user_name: String,
    /// ISO-8601 time of the change
    pub timestamp: String,
}

/// Confirmation of a leave (`ROOM_LEFT`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomLeft {
    /// Room that was left
    pub room_id: String,
}

/// Confirmation of room creation (`ROOM_CREATED`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreated {
    /// ID of the new room
    pub room_id: String,
    /// Display name of the new room
    pub name: String,
}

/// Error category reported in `ERROR` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Required field missing or empty
    ValidationError,
    /// Identity or room membership prerequisite not met
    PreconditionError,
    /// Referenced room vanished between check and use
    NotFoundError,
    /// Unparseable or untyped input
    ProtocolError,
    /// Unrecognized message type
    UnknownEvent,
}

impl ErrorCode {
    /// Wire representation of the code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::PreconditionError => "PRECONDITION_ERROR",
            Self::NotFoundError => "NOT_FOUND_ERROR",
            Self::ProtocolError => "PROTOCOL_ERROR",
            Self::UnknownEvent => "UNKNOWN_EVENT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error report (`ERROR`), only ever sent to the connection that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error category
    pub code: ErrorCode,
    /// Human-readable description
    pub message: String,
}

impl ErrorPayload {
    /// Create an error payload.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}
