//! Dispatch errors.
//!
//! Every failure while handling a client message is one of these. They are
//! all recoverable: the driver turns them into an `ERROR` frame for the
//! originating connection and leaves session and room state untouched. The
//! one exception is [`DispatchError::NotFound`] on a chat message, which also
//! clears the session's stale room so the client can rejoin.

use roomcast_proto::{ErrorCode, ErrorPayload, ProtocolError};
use thiserror::Error;

/// Errors reported back to the client that sent the offending message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A required field is missing or empty
    #[error("{0}")]
    Validation(String),

    /// Identity or room membership prerequisite not met
    #[error("{0}")]
    Precondition(String),

    /// The referenced room disappeared between check and use
    #[error("{0}")]
    NotFound(String),

    /// Input could not be parsed into a typed message
    #[error("{0}")]
    Protocol(String),

    /// Input carried a type tag the relay does not know
    #[error("{0}")]
    UnknownEvent(String),
}

impl DispatchError {
    /// Wire error code for this error.
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::Precondition(_) => ErrorCode::PreconditionError,
            Self::NotFound(_) => ErrorCode::NotFoundError,
            Self::Protocol(_) => ErrorCode::ProtocolError,
            Self::UnknownEvent(_) => ErrorCode::UnknownEvent,
        }
    }

    /// `ERROR` payload describing this error.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload::new(self.code(), self.to_string())
    }
}

impl From<ProtocolError> for DispatchError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnknownType(kind) => {
                Self::UnknownEvent(format!("unknown event type: {kind}"))
            },
            other => Self::Protocol(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_variants() {
        assert_eq!(DispatchError::Validation("x".into()).code(), ErrorCode::ValidationError);
        assert_eq!(DispatchError::Precondition("x".into()).code(), ErrorCode::PreconditionError);
        assert_eq!(DispatchError::NotFound("x".into()).code(), ErrorCode::NotFoundError);
        assert_eq!(DispatchError::Protocol("x".into()).code(), ErrorCode::ProtocolError);
        assert_eq!(DispatchError::UnknownEvent("x".into()).code(), ErrorCode::UnknownEvent);
    }

    #[test]
    fn unknown_type_maps_to_unknown_event() {
        let err = DispatchError::from(ProtocolError::UnknownType("DANCE".into()));
        assert_eq!(err, DispatchError::UnknownEvent("unknown event type: DANCE".into()));
    }

    #[test]
    fn malformed_input_maps_to_protocol() {
        let err = DispatchError::from(ProtocolError::MissingType);
        assert!(matches!(err, DispatchError::Protocol(_)));
        assert_eq!(err.to_payload().code, ErrorCode::ProtocolError);
    }
}
