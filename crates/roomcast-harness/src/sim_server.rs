//! In-memory server wrapper.
//!
//! `SimServer` wraps `ServerDriver` with `SimEnv` and executes its actions
//! against per-connection mailboxes. Tests drive it explicitly: nothing runs
//! in the background, and every call returns once all resulting actions have
//! been applied.

use std::collections::{HashMap, HashSet};

use roomcast_core::ConnectionId;
use roomcast_proto::{ClientMessage, ServerMessage};
use roomcast_server::{
    DriverConfig, DriverError, LogLevel, ServerAction, ServerDriver, ServerEvent,
};

use crate::SimEnv;

/// Simulation server.
pub struct SimServer {
    /// The action-based server driver
    driver: ServerDriver<SimEnv>,
    /// Frames delivered to each open connection, oldest first
    mailboxes: HashMap<ConnectionId, Vec<ServerMessage>>,
    /// Connections the driver asked to close
    closed_by_server: HashSet<ConnectionId>,
    /// Next connection ID
    next_connection_id: ConnectionId,
}

impl SimServer {
    /// Server with the default configuration and seed 0.
    pub fn new() -> Self {
        Self::with_config(SimEnv::new(), DriverConfig::default())
    }

    /// Server with a specific environment and configuration.
    pub fn with_config(env: SimEnv, config: DriverConfig) -> Self {
        Self {
            driver: ServerDriver::new(env, config),
            mailboxes: HashMap::new(),
            closed_by_server: HashSet::new(),
            next_connection_id: 1,
        }
    }

    /// Open a connection and return its ID.
    pub fn connect(&mut self) -> Result<ConnectionId, DriverError> {
        let connection_id = self.next_connection_id;
        self.next_connection_id += 1;

        self.mailboxes.insert(connection_id, Vec::new());
        let actions =
            self.driver.process_event(ServerEvent::ConnectionAccepted { connection_id })?;
        self.execute_actions(actions);

        Ok(connection_id)
    }

    /// Deliver a raw text frame from a connection.
    pub fn send_text(
        &mut self,
        connection_id: ConnectionId,
        text: impl Into<String>,
    ) -> Result<(), DriverError> {
        let actions = self.driver.process_event(ServerEvent::MessageReceived {
            connection_id,
            text: text.into(),
        })?;
        self.execute_actions(actions);
        Ok(())
    }

    /// Encode and deliver a client message.
    pub fn send(
        &mut self,
        connection_id: ConnectionId,
        message: &ClientMessage,
    ) -> Result<(), DriverError> {
        match message.encode() {
            Ok(text) => self.send_text(connection_id, text),
            Err(e) => {
                tracing::error!("failed to encode {}: {}", message.kind(), e);
                Ok(())
            },
        }
    }

    /// Close a connection from the client side.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Result<(), DriverError> {
        self.mailboxes.remove(&connection_id);
        let actions = self.driver.process_event(ServerEvent::ConnectionClosed {
            connection_id,
            reason: "client disconnect".to_string(),
        })?;
        self.execute_actions(actions);
        Ok(())
    }

    /// Drain the frames delivered to a connection so far.
    pub fn take_messages(&mut self, connection_id: ConnectionId) -> Vec<ServerMessage> {
        self.mailboxes.get_mut(&connection_id).map(std::mem::take).unwrap_or_default()
    }

    /// Frames delivered to a connection and not yet taken.
    pub fn messages(&self, connection_id: ConnectionId) -> &[ServerMessage] {
        self.mailboxes.get(&connection_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether the connection is still open.
    pub fn is_open(&self, connection_id: ConnectionId) -> bool {
        self.mailboxes.contains_key(&connection_id)
    }

    /// Whether the driver closed this connection.
    pub fn was_closed_by_server(&self, connection_id: ConnectionId) -> bool {
        self.closed_by_server.contains(&connection_id)
    }

    /// Underlying driver for test assertions.
    pub fn driver(&self) -> &ServerDriver<SimEnv> {
        &self.driver
    }

    /// The simulated environment, for advancing time.
    pub fn env(&self) -> &SimEnv {
        self.driver.env()
    }

    fn execute_actions(&mut self, actions: Vec<ServerAction<std::time::Duration>>) {
        for action in actions {
            match action {
                ServerAction::SendToConnection { connection_id, message } => {
                    self.deliver(connection_id, message);
                },

                ServerAction::BroadcastToRoom { recipients, message, .. } => {
                    for connection_id in recipients {
                        self.deliver(connection_id, message.clone());
                    }
                },

                ServerAction::CloseConnection { connection_id, reason } => {
                    tracing::debug!("closing connection {}: {}", connection_id, reason);
                    self.closed_by_server.insert(connection_id);
                    if self.mailboxes.remove(&connection_id).is_some() {
                        match self
                            .driver
                            .process_event(ServerEvent::ConnectionClosed { connection_id, reason })
                        {
                            Ok(actions) => self.execute_actions(actions),
                            Err(e) => tracing::debug!("close of {} failed: {}", connection_id, e),
                        }
                    }
                },

                ServerAction::Log { level, message, .. } => match level {
                    LogLevel::Debug => tracing::debug!("{}", message),
                    LogLevel::Info => tracing::info!("{}", message),
                    LogLevel::Warn => tracing::warn!("{}", message),
                    LogLevel::Error => tracing::error!("{}", message),
                },
            }
        }
    }

    /// Frames to a connection that is gone are dropped, as in production.
    fn deliver(&mut self, connection_id: ConnectionId, message: ServerMessage) {
        if let Some(mailbox) = self.mailboxes.get_mut(&connection_id) {
            mailbox.push(message);
        }
    }
}

impl Default for SimServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire tags of `messages`, in order. Handy for asserting on sequences.
pub fn frames_for(messages: &[ServerMessage]) -> Vec<&'static str> {
    messages.iter().map(ServerMessage::kind).collect()
}
