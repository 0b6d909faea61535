//! Roomcast wire protocol.
//!
//! Every frame on the wire is one JSON text message with a `type` tag and an
//! optional `payload` object:
//!
//! ```json
//! {"type": "JOIN_ROOM", "payload": {"roomId": "default-room"}}
//! ```
//!
//! [`ClientMessage`] covers what clients send and [`ServerMessage`] covers
//! what the relay sends back (direct replies and room broadcasts). Decoding is
//! total: any input either yields a message or a [`ProtocolError`], never a
//! panic.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod message;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use message::{ClientMessage, ServerMessage};
pub use payloads::{
    ChatBroadcast, ChatMessage, ChatMessageRequest, CreateRoom, ErrorCode, ErrorPayload, JoinRoom,
    MessageHistory, Presence, RoomCreated, RoomJoined, RoomLeft, RoomUsers, SetUser, UserSet,
    UserSummary,
};
