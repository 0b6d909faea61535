//! Payload types carried inside the message envelope.
//!
//! Field names are camelCase on the wire. Client payload fields are all
//! optional at the decoding layer so that a missing field reaches the
//! dispatcher as a validation failure rather than a decode failure.

pub mod chat;
pub mod client;
pub mod server;

pub use chat::{ChatBroadcast, ChatMessage};
pub use client::{ChatMessageRequest, CreateRoom, JoinRoom, SetUser};
pub use server::{
    ErrorCode, ErrorPayload, MessageHistory, Presence, RoomCreated, RoomJoined, RoomLeft,
    RoomUsers, UserSet, UserSummary,
};
