//! Roomcast core state.
//!
//! Pure data structures with no I/O: the bounded per-room [`MessageStore`],
//! [`Room`] membership, the [`RoomRegistry`] with its permanent default room,
//! and the per-connection [`Session`]. The server crate's driver is the only
//! writer; everything here is synchronous and single-owner.
//!
//! # Invariants
//!
//! - The default room always exists.
//! - A non-default room is removed as soon as its last member leaves.
//! - A room's history never exceeds its configured bound.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod history;
pub mod registry;
pub mod room;
pub mod session;

pub use env::Environment;
pub use error::DispatchError;
pub use history::MessageStore;
pub use registry::RoomRegistry;
pub use room::{Member, Room};
pub use session::{Session, default_user_name};

/// Opaque handle of one client connection, assigned by the runtime.
pub type ConnectionId = u64;

/// Room identifier as it appears on the wire.
pub type RoomId = String;

/// ID of the room that always exists.
pub const DEFAULT_ROOM_ID: &str = "default-room";

/// Display name of the default room.
pub const DEFAULT_ROOM_NAME: &str = "General";

/// Messages retained per room.
pub const MAX_HISTORY: usize = 100;
