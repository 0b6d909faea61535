//! Driver error types.
//!
//! Client mistakes never reach this type; the driver answers them with an
//! `ERROR` frame. These errors mean the runtime and the driver disagree about
//! which connections exist.

use std::fmt;

use roomcast_core::ConnectionId;

/// Errors returned by [`crate::ServerDriver::process_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Connection not found.
    ///
    /// A frame arrived for a connection the driver never accepted or has
    /// already closed. Expected when a close races an in-flight frame; the
    /// runtime drops the frame.
    SessionNotFound(ConnectionId),

    /// Connection already registered.
    ///
    /// The runtime reused a connection ID that is still open. This is a logic
    /// bug in the runtime; connection IDs must be unique.
    SessionAlreadyExists(ConnectionId),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound(id) => write!(f, "connection not found: {id}"),
            Self::SessionAlreadyExists(id) => write!(f, "connection already exists: {id}"),
        }
    }
}

impl std::error::Error for DriverError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_connection() {
        assert_eq!(DriverError::SessionNotFound(7).to_string(), "connection not found: 7");
        assert_eq!(
            DriverError::SessionAlreadyExists(7).to_string(),
            "connection already exists: 7"
        );
    }
}
