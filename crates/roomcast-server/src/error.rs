//! Server error types.

use thiserror::Error;

/// Errors that can occur in the server runtime.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, malformed room argument, etc.).
    ///
    /// Fatal: prevents server startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport/network error (listener failure, I/O error, etc.).
    #[error("transport error: {0}")]
    Transport(String),
}
