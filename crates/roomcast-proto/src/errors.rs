//! Protocol errors.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding or encoding wire messages.
///
/// None of these are fatal for a connection: the relay answers with an
/// `ERROR` frame and keeps reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Input is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// Input is valid JSON but not an object.
    #[error("message must be a JSON object")]
    NotAnObject,

    /// Object has no string `type` field.
    #[error("message is missing a string \"type\" field")]
    MissingType,

    /// `type` names no known client message.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// Payload does not match the shape expected for its type.
    #[error("invalid payload for {kind}: {reason}")]
    InvalidPayload {
        /// The `type` tag of the offending message
        kind: String,
        /// Decoder error text
        reason: String,
    },

    /// Serializing an outbound message failed.
    #[error("failed to encode message: {0}")]
    Encode(String),
}
