//! Deterministic simulation harness for Roomcast testing.
//!
//! [`SimEnv`] replaces the system clock and OS entropy with a virtual clock
//! and a seeded RNG. [`SimServer`] runs the real `ServerDriver` against
//! in-memory mailboxes instead of sockets, so a test can open connections,
//! send raw frames and read back exactly what each client would have
//! received.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_env;
pub mod sim_server;

pub use sim_env::SimEnv;
pub use sim_server::{SimServer, frames_for};
