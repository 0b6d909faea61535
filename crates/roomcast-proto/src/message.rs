//! Message envelopes.
//!
//! Both directions share the `{"type": ..., "payload": ...}` envelope. The
//! relay also accepts the flat form where payload fields sit next to `type`
//! (`{"type": "SET_USER", "userId": "u1"}`), which older clients send.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    errors::{ProtocolError, Result},
    payloads::{
        ChatBroadcast, ChatMessageRequest, CreateRoom, ErrorPayload, JoinRoom, MessageHistory,
        Presence, RoomCreated, RoomJoined, RoomLeft, RoomUsers, SetUser, UserSet,
    },
};

/// Messages a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Claim an identity
    SetUser(SetUser),
    /// Join a room, leaving the current one first
    JoinRoom(JoinRoom),
    /// Post a message to the current room
    ChatMessage(ChatMessageRequest),
    /// Leave the current room
    LeaveRoom,
    /// Create an empty room
    CreateRoom(CreateRoom),
}

impl ClientMessage {
    /// Decode one inbound text frame.
    ///
    /// Unknown `type` tags yield [`ProtocolError::UnknownType`]; everything
    /// else that cannot be understood yields one of the malformed-input
    /// variants.
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;

        let Value::Object(mut object) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let kind = match object.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(ProtocolError::MissingType),
        };

        let payload = object.remove("payload").unwrap_or(Value::Object(object));

        match kind.as_str() {
            "SET_USER" => payload_of(&kind, payload).map(Self::SetUser),
            "JOIN_ROOM" => payload_of(&kind, payload).map(Self::JoinRoom),
            "CHAT_MESSAGE" => payload_of(&kind, payload).map(Self::ChatMessage),
            "LEAVE_ROOM" => Ok(Self::LeaveRoom),
            "CREATE_ROOM" => payload_of(&kind, payload).map(Self::CreateRoom),
            _ => Err(ProtocolError::UnknownType(kind)),
        }
    }

    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Wire tag of this message.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SetUser(_) => "SET_USER",
            Self::JoinRoom(_) => "JOIN_ROOM",
            Self::ChatMessage(_) => "CHAT_MESSAGE",
            Self::LeaveRoom => "LEAVE_ROOM",
            Self::CreateRoom(_) => "CREATE_ROOM",
        }
    }
}

fn payload_of<T: DeserializeOwned + Default>(kind: &str, payload: Value) -> Result<T> {
    if payload.is_null() {
        return Ok(T::default());
    }

    serde_json::from_value(payload).map_err(|e| ProtocolError::InvalidPayload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

/// Messages the relay sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Identity accepted
    UserSet(UserSet),
    /// Join accepted
    RoomJoined(RoomJoined),
    /// Member listing after a join
    RoomUsers(RoomUsers),
    /// History replay after a join
    MessageHistory(MessageHistory),
    /// A member joined (broadcast, includes the joiner)
    UserJoined(Presence),
    /// A chat message (broadcast, includes the sender)
    ChatMessage(ChatBroadcast),
    /// A member left (broadcast to remaining members)
    UserLeft(Presence),
    /// Leave accepted
    RoomLeft(RoomLeft),
    /// Room created
    RoomCreated(RoomCreated),
    /// Request rejected
    Error(ErrorPayload),
}

impl ServerMessage {
    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Decode a frame produced by [`ServerMessage::encode`].
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))
    }

    /// Wire tag of this message.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UserSet(_) => "USER_SET",
            Self::RoomJoined(_) => "ROOM_JOINED",
            Self::RoomUsers(_) => "ROOM_USERS",
            Self::MessageHistory(_) => "MESSAGE_HISTORY",
            Self::UserJoined(_) => "USER_JOINED",
            Self::ChatMessage(_) => "CHAT_MESSAGE",
            Self::UserLeft(_) => "USER_LEFT",
            Self::RoomLeft(_) => "ROOM_LEFT",
            Self::RoomCreated(_) => "ROOM_CREATED",
            Self::Error(_) => "ERROR",
        }
    }
}
