//! Server driver.
//!
//! Owns every [`Session`] and the [`RoomRegistry`], and turns inbound events
//! into [`ServerAction`]s for the runtime to execute. No I/O happens here:
//! the same driver runs under the production WebSocket runtime and under the
//! in-memory simulation harness.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use roomcast_core::{
    ConnectionId, DEFAULT_ROOM_ID, DEFAULT_ROOM_NAME, DispatchError, Environment, MAX_HISTORY,
    Member, RoomId, RoomRegistry, Session, default_user_name,
};
use roomcast_proto::{
    ChatBroadcast, ChatMessage, ChatMessageRequest, ClientMessage, CreateRoom, JoinRoom,
    MessageHistory, Presence, RoomCreated, RoomJoined, RoomLeft, RoomUsers, ServerMessage,
    SetUser, UserSet,
};

use crate::server_error::DriverError;

/// Driver configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// ID of the room that always exists
    pub default_room_id: RoomId,
    /// Display name of the default room
    pub default_room_name: String,
    /// Messages retained per room
    pub max_history: usize,
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Maximum live rooms, the default room included. `CREATE_ROOM` past this
    /// is rejected.
    pub max_rooms: usize,
    /// Extra rooms created at startup as `(id, name)` pairs
    pub seed_rooms: Vec<(RoomId, String)>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            default_room_id: DEFAULT_ROOM_ID.to_string(),
            default_room_name: DEFAULT_ROOM_NAME.to_string(),
            max_history: MAX_HISTORY,
            max_connections: 10_000,
            max_rooms: 1_000,
            seed_rooms: Vec::new(),
        }
    }
}

/// Events that the server driver processes.
///
/// These are produced by the external runtime (simulation or production).
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection was accepted
    ConnectionAccepted {
        /// Unique connection ID assigned by the runtime
        connection_id: ConnectionId,
    },

    /// A text frame was received from a connection
    MessageReceived {
        /// Connection that sent the frame
        connection_id: ConnectionId,
        /// Raw frame contents
        text: String,
    },

    /// A connection was closed (by peer or error)
    ConnectionClosed {
        /// Connection that was closed
        connection_id: ConnectionId,
        /// Reason for closure
        reason: String,
    },
}

/// Actions that the server driver produces.
///
/// These are executed by runtime-specific code (production or simulation).
#[derive(Debug, Clone)]
pub enum ServerAction<I = std::time::Instant> {
    /// Send a message to one connection
    SendToConnection {
        /// Target connection
        connection_id: ConnectionId,
        /// Message to send
        message: ServerMessage,
    },

    /// Send a message to every member of a room
    BroadcastToRoom {
        /// Room the broadcast belongs to
        room_id: RoomId,
        /// Members at the moment the broadcast was produced
        recipients: Vec<ConnectionId>,
        /// Message to send
        message: ServerMessage,
    },

    /// Close a connection
    CloseConnection {
        /// Connection to close
        connection_id: ConnectionId,
        /// Reason for closure
        reason: String,
    },

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
        /// When the event occurred
        timestamp: I,
    },
}

/// Log levels for server actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

/// Action-based server driver.
///
/// Processes one event at a time. Callers must serialize events (the
/// production runtime holds a mutex across `process_event` and the execution
/// of its actions), which makes every handler atomic with respect to the
/// others.
pub struct ServerDriver<E: Environment> {
    /// Per-connection identity and room membership
    sessions: HashMap<ConnectionId, Session>,
    /// Live rooms
    rooms: RoomRegistry,
    /// Environment (time, RNG)
    env: E,
    /// Driver configuration
    config: DriverConfig,
}

impl<E: Environment> ServerDriver<E> {
    /// Create a new server driver with the default room and any seed rooms.
    pub fn new(env: E, config: DriverConfig) -> Self {
        let mut rooms = RoomRegistry::new(
            config.default_room_id.clone(),
            config.default_room_name.clone(),
            config.max_history,
        );
        for (room_id, name) in &config.seed_rooms {
            rooms.create_room(room_id.clone(), name.clone());
        }

        Self { sessions: HashMap::new(), rooms, env, config }
    }

    /// Process a server event and return actions to execute.
    ///
    /// This is the main entry point for the server driver. Client mistakes
    /// never surface as `Err`: they become `ERROR` replies to the offending
    /// connection. `Err` is reserved for runtime bookkeeping bugs such as a
    /// frame arriving for a connection that was never accepted.
    pub fn process_event(
        &mut self,
        event: ServerEvent,
    ) -> Result<Vec<ServerAction<E::Instant>>, DriverError> {
        match event {
            ServerEvent::ConnectionAccepted { connection_id } => {
                self.handle_connection_accepted(connection_id)
            },
            ServerEvent::MessageReceived { connection_id, text } => {
                self.handle_message_received(connection_id, &text)
            },
            ServerEvent::ConnectionClosed { connection_id, reason } => {
                Ok(self.handle_connection_closed(connection_id, &reason))
            },
        }
    }

    /// Handle a new connection being accepted.
    fn handle_connection_accepted(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Vec<ServerAction<E::Instant>>, DriverError> {
        let now = self.env.now();

        if self.sessions.contains_key(&connection_id) {
            return Err(DriverError::SessionAlreadyExists(connection_id));
        }

        if self.sessions.len() >= self.config.max_connections {
            return Ok(vec![
                ServerAction::CloseConnection {
                    connection_id,
                    reason: "max connections exceeded".to_string(),
                },
                ServerAction::Log {
                    level: LogLevel::Warn,
                    message: format!(
                        "connection {connection_id} rejected: limit of {} reached",
                        self.config.max_connections
                    ),
                    timestamp: now,
                },
            ]);
        }

        self.sessions.insert(connection_id, Session::new());

        Ok(vec![ServerAction::Log {
            level: LogLevel::Debug,
            message: format!("connection {connection_id} accepted"),
            timestamp: now,
        }])
    }

    /// Handle one text frame from a connection.
    fn handle_message_received(
        &mut self,
        connection_id: ConnectionId,
        text: &str,
    ) -> Result<Vec<ServerAction<E::Instant>>, DriverError> {
        if !self.sessions.contains_key(&connection_id) {
            return Err(DriverError::SessionNotFound(connection_id));
        }

        let result = ClientMessage::decode(text)
            .map_err(DispatchError::from)
            .and_then(|message| self.dispatch(connection_id, message));

        match result {
            Ok(actions) => Ok(actions),
            Err(err) => Ok(self.make_error_response(connection_id, &err)),
        }
    }

    /// Route a decoded message to its handler.
    fn dispatch(
        &mut self,
        connection_id: ConnectionId,
        message: ClientMessage,
    ) -> Result<Vec<ServerAction<E::Instant>>, DispatchError> {
        match message {
            ClientMessage::SetUser(request) => self.handle_set_user(connection_id, request),
            ClientMessage::JoinRoom(request) => self.handle_join_room(connection_id, request),
            ClientMessage::ChatMessage(request) => self.handle_chat_message(connection_id, request),
            ClientMessage::LeaveRoom => self.handle_leave_room(connection_id),
            ClientMessage::CreateRoom(request) => self.handle_create_room(connection_id, request),
        }
    }

    /// `SET_USER`: record the claimed identity.
    ///
    /// Room membership is not touched. A connection that re-identifies while
    /// in a room stays listed under the identity it joined with until it
    /// leaves or rejoins.
    fn handle_set_user(
        &mut self,
        connection_id: ConnectionId,
        request: SetUser,
    ) -> Result<Vec<ServerAction<E::Instant>>, DispatchError> {
        let now = self.env.now();
        let user_id = required(request.user_id, "userId")?;

        let session = session_mut(&mut self.sessions, connection_id)?;
        session.identify(user_id.clone(), request.user_name);
        let user_name = session.display_name().unwrap_or_else(|| default_user_name(&user_id));

        Ok(vec![
            ServerAction::SendToConnection {
                connection_id,
                message: ServerMessage::UserSet(UserSet {
                    user_id: user_id.clone(),
                    user_name: user_name.clone(),
                }),
            },
            ServerAction::Log {
                level: LogLevel::Debug,
                message: format!("connection {connection_id} identified as {user_id} ({user_name})"),
                timestamp: now,
            },
        ])
    }

    /// `JOIN_ROOM`: leave the current room, then join the requested one (or
    /// the default room if it does not exist).
    fn handle_join_room(
        &mut self,
        connection_id: ConnectionId,
        request: JoinRoom,
    ) -> Result<Vec<ServerAction<E::Instant>>, DispatchError> {
        let now = self.env.now();
        let timestamp = self.timestamp();
        let requested = required(request.room_id, "roomId")?;

        let session = session_mut(&mut self.sessions, connection_id)?;
        let Some(user_id) = session.user_id.clone() else {
            return Err(DispatchError::Precondition("set a user before joining a room".into()));
        };
        let user_name = session.display_name().unwrap_or_else(|| default_user_name(&user_id));

        let target = self.rooms.resolve(&requested);
        let mut actions = Vec::new();

        leave_current_room(
            session,
            &mut self.rooms,
            connection_id,
            Some(&target),
            &timestamp,
            now,
            &mut actions,
        );

        let Some(room) = self.rooms.get_mut(&target) else {
            return Err(DispatchError::NotFound(format!("room not found: {target}")));
        };

        room.add_member(connection_id, Member {
            user_id: user_id.clone(),
            user_name: user_name.clone(),
        });
        session.current_room = Some(target.clone());

        actions.push(ServerAction::BroadcastToRoom {
            room_id: target.clone(),
            recipients: room.connections().collect(),
            message: ServerMessage::UserJoined(Presence {
                user_id: user_id.clone(),
                user_name,
                timestamp,
            }),
        });
        actions.push(ServerAction::SendToConnection {
            connection_id,
            message: ServerMessage::RoomJoined(RoomJoined {
                room_id: target.clone(),
                name: room.name().to_string(),
            }),
        });
        actions.push(ServerAction::SendToConnection {
            connection_id,
            message: ServerMessage::RoomUsers(RoomUsers { users: room.user_summaries() }),
        });
        if !room.history().is_empty() {
            actions.push(ServerAction::SendToConnection {
                connection_id,
                message: ServerMessage::MessageHistory(MessageHistory {
                    messages: room.history().to_vec(),
                }),
            });
        }

        let redirected =
            if target == requested { String::new() } else { format!(" (requested {requested})") };
        actions.push(ServerAction::Log {
            level: LogLevel::Debug,
            message: format!(
                "{user_id} joined {target}{redirected}, {} member(s)",
                room.member_count()
            ),
            timestamp: now,
        });

        Ok(actions)
    }

    /// `CHAT_MESSAGE`: append to the current room's history and broadcast.
    fn handle_chat_message(
        &mut self,
        connection_id: ConnectionId,
        request: ChatMessageRequest,
    ) -> Result<Vec<ServerAction<E::Instant>>, DispatchError> {
        let content = required(request.content, "content")?;
        let id = match request.id {
            Some(id) => id,
            None => self.message_id(),
        };
        let timestamp = match request.timestamp {
            Some(timestamp) => timestamp,
            None => self.timestamp(),
        };

        let session = session_mut(&mut self.sessions, connection_id)?;
        let Some(sender_id) = session.user_id.clone() else {
            return Err(DispatchError::Precondition("set a user before sending messages".into()));
        };
        let Some(room_id) = session.current_room.clone() else {
            return Err(DispatchError::Precondition("join a room before sending messages".into()));
        };

        let Some(room) = self.rooms.get_mut(&room_id) else {
            session.current_room = None;
            return Err(DispatchError::NotFound(format!(
                "room {room_id} no longer exists, please rejoin"
            )));
        };

        let sender_name = request
            .sender_name
            .filter(|name| !name.is_empty())
            .or_else(|| session.display_name())
            .unwrap_or_else(|| default_user_name(&sender_id));

        let message = ChatMessage { id, content, sender_id, sender_name, timestamp, room_id };
        let broadcast = ChatBroadcast::from(&message);
        room.append(message);

        Ok(vec![ServerAction::BroadcastToRoom {
            room_id: room.id().to_string(),
            recipients: room.connections().collect(),
            message: ServerMessage::ChatMessage(broadcast),
        }])
    }

    /// `LEAVE_ROOM`: leave the current room and confirm.
    fn handle_leave_room(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Vec<ServerAction<E::Instant>>, DispatchError> {
        let now = self.env.now();
        let timestamp = self.timestamp();

        let session = session_mut(&mut self.sessions, connection_id)?;
        let Some(room_id) = session.current_room.clone() else {
            return Err(DispatchError::Precondition("not in a room".into()));
        };

        let mut actions = Vec::new();
        leave_current_room(
            session,
            &mut self.rooms,
            connection_id,
            None,
            &timestamp,
            now,
            &mut actions,
        );
        actions.push(ServerAction::SendToConnection {
            connection_id,
            message: ServerMessage::RoomLeft(RoomLeft { room_id }),
        });

        Ok(actions)
    }

    /// `CREATE_ROOM`: register an empty room. The creator does not join it;
    /// if nobody has joined by the time the creator disconnects, the room is
    /// removed.
    fn handle_create_room(
        &mut self,
        connection_id: ConnectionId,
        request: CreateRoom,
    ) -> Result<Vec<ServerAction<E::Instant>>, DispatchError> {
        let now = self.env.now();
        let room_id = required(request.room_id, "roomId")?;

        let session = session_mut(&mut self.sessions, connection_id)?;
        if session.user_id.is_none() {
            return Err(DispatchError::Precondition("set a user before creating a room".into()));
        }

        if self.rooms.contains(&room_id) {
            return Err(DispatchError::Precondition(format!("room already exists: {room_id}")));
        }
        if self.rooms.room_count() >= self.config.max_rooms {
            return Err(DispatchError::Precondition(format!(
                "room limit of {} reached",
                self.config.max_rooms
            )));
        }

        let name = request.name.filter(|name| !name.is_empty()).unwrap_or_else(|| room_id.clone());
        self.rooms.create_room_for(connection_id, room_id.clone(), name.clone());

        Ok(vec![
            ServerAction::SendToConnection {
                connection_id,
                message: ServerMessage::RoomCreated(RoomCreated {
                    room_id: room_id.clone(),
                    name: name.clone(),
                }),
            },
            ServerAction::Log {
                level: LogLevel::Info,
                message: format!("room {room_id} ({name}) created by connection {connection_id}"),
                timestamp: now,
            },
        ])
    }

    /// Handle a connection being closed.
    ///
    /// Closing an unknown or already-closed connection is a no-op.
    fn handle_connection_closed(
        &mut self,
        connection_id: ConnectionId,
        reason: &str,
    ) -> Vec<ServerAction<E::Instant>> {
        let now = self.env.now();
        let timestamp = self.timestamp();

        let Some(mut session) = self.sessions.remove(&connection_id) else {
            return vec![ServerAction::Log {
                level: LogLevel::Debug,
                message: format!("close for unknown connection {connection_id} ignored"),
                timestamp: now,
            }];
        };

        let mut actions = Vec::new();
        leave_current_room(
            &mut session,
            &mut self.rooms,
            connection_id,
            None,
            &timestamp,
            now,
            &mut actions,
        );
        for room_id in self.rooms.remove_abandoned(connection_id) {
            actions.push(ServerAction::Log {
                level: LogLevel::Debug,
                message: format!("room {room_id} removed: creator left before anyone joined"),
                timestamp: now,
            });
        }
        actions.push(ServerAction::Log {
            level: LogLevel::Info,
            message: format!("connection {connection_id} closed: {reason}"),
            timestamp: now,
        });

        actions
    }

    fn make_error_response(
        &self,
        connection_id: ConnectionId,
        error: &DispatchError,
    ) -> Vec<ServerAction<E::Instant>> {
        let payload = error.to_payload();
        let log = ServerAction::Log {
            level: LogLevel::Warn,
            message: format!("rejected message from {connection_id}: {}: {error}", payload.code),
            timestamp: self.env.now(),
        };

        vec![
            ServerAction::SendToConnection { connection_id, message: ServerMessage::Error(payload) },
            log,
        ]
    }

    /// ISO-8601 UTC timestamp with millisecond precision.
    fn timestamp(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.env.wall_clock_millis())
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Fresh random message ID.
    fn message_id(&self) -> String {
        uuid::Builder::from_random_bytes(self.env.random_id_bytes()).into_uuid().to_string()
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of live rooms, the default room included.
    pub fn room_count(&self) -> usize {
        self.rooms.room_count()
    }

    /// Check if a room exists.
    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.contains(room_id)
    }

    /// Connections currently in `room_id`.
    pub fn sessions_in_room(&self, room_id: &str) -> impl Iterator<Item = ConnectionId> + '_ {
        self.rooms.get(room_id).into_iter().flat_map(|room| room.connections())
    }

    /// Session state of a connection.
    pub fn session(&self, connection_id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&connection_id)
    }

    /// The room registry, for inspection.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Driver configuration.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// The environment this driver reads time and randomness from.
    pub fn env(&self) -> &E {
        &self.env
    }
}

impl<E: Environment> std::fmt::Debug for ServerDriver<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDriver")
            .field("connection_count", &self.sessions.len())
            .field("room_count", &self.rooms.room_count())
            .finish()
    }
}

/// Remove a connection from its current room.
///
/// Broadcasts `USER_LEFT` to the remaining members and deletes the room if it
/// emptied, unless it is the default room or `retain` names it (a rejoin of
/// the same room must not destroy it in between). Clears `current_room` in
/// every case.
fn leave_current_room<I: Copy>(
    session: &mut Session,
    rooms: &mut RoomRegistry,
    connection_id: ConnectionId,
    retain: Option<&str>,
    timestamp: &str,
    now: I,
    actions: &mut Vec<ServerAction<I>>,
) {
    let Some(room_id) = session.current_room.take() else {
        return;
    };
    let Some(room) = rooms.get_mut(&room_id) else {
        return;
    };

    let member = room.remove_member(connection_id);
    if let (Some(_), Some(member)) = (&session.user_id, member) {
        actions.push(ServerAction::BroadcastToRoom {
            room_id: room_id.clone(),
            recipients: room.connections().collect(),
            message: ServerMessage::UserLeft(Presence {
                user_id: member.user_id,
                user_name: member.user_name,
                timestamp: timestamp.to_string(),
            }),
        });
    }

    if retain != Some(room_id.as_str()) && rooms.delete_if_empty_and_not_default(&room_id) {
        actions.push(ServerAction::Log {
            level: LogLevel::Debug,
            message: format!("room {room_id} removed after its last member left"),
            timestamp: now,
        });
    }
}

fn session_mut(
    sessions: &mut HashMap<ConnectionId, Session>,
    connection_id: ConnectionId,
) -> Result<&mut Session, DispatchError> {
    sessions
        .get_mut(&connection_id)
        .ok_or_else(|| DispatchError::Precondition(format!("unknown connection {connection_id}")))
}

/// A field that must be present and non-empty.
fn required(value: Option<String>, field: &str) -> Result<String, DispatchError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| DispatchError::Validation(format!("{field} is required")))
}
