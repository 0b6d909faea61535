//! Chat message records.

use serde::{Deserialize, Serialize};

/// A chat message as stored in a room's history and replayed in
/// `MESSAGE_HISTORY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message ID (client-supplied or generated)
    pub id: String,
    /// Message text
    pub content: String,
    /// User ID of the sender
    pub sender_id: String,
    /// Display name of the sender
    pub sender_name: String,
    /// ISO-8601 timestamp
    pub timestamp: String,
    /// Room the message was posted to
    pub room_id: String,
}

/// Live `CHAT_MESSAGE` broadcast. Same as [`ChatMessage`] without the room ID,
/// which every recipient already knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBroadcast {
    /// Message ID
    pub id: String,
    /// Message text
    pub content: String,
    /// User ID of the sender
    pub sender_id: String,
    /// Display name of the sender
    pub sender_name: String,
    /// ISO-8601 timestamp
    pub timestamp: String,
}

impl From<&ChatMessage> for ChatBroadcast {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id.clone(),
            content: message.content.clone(),
            sender_id: message.sender_id.clone(),
            sender_name: message.sender_name.clone(),
            timestamp: message.timestamp.clone(),
        }
    }
}
