//! Roomcast production server.
//!
//! Production server implementation using axum for the HTTP and WebSocket
//! transport, Tokio for the async runtime, and system time with OS
//! randomness.
//!
//! # Architecture
//!
//! The [`ServerDriver`] is pure logic: it takes a [`ServerEvent`] and returns
//! the [`ServerAction`]s to perform. [`Server`] owns the I/O. It accepts
//! WebSocket connections, feeds their frames to the driver, and executes the
//! resulting actions against per-connection outbound queues.
//!
//! The driver sits behind one async mutex that is held across both
//! `process_event` and the execution of its actions. Every handler is
//! therefore atomic, and a broadcast reaches exactly the members the driver
//! saw when it produced it.
//!
//! # Components
//!
//! - [`ServerDriver`]: Action-based orchestrator (pure logic, no I/O)
//! - [`Server`]: Production runtime that executes `ServerDriver` actions
//! - [`ClientConnection`]: Outbound queue and liveness for one client
//! - [`SystemEnv`]: Production environment (real time, OS RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod driver;
mod error;
mod http;
mod server_error;
mod system_env;
mod transport;

use std::{
    collections::HashMap,
    future::Future,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

pub use connection::ClientConnection;
pub use driver::{DriverConfig, LogLevel, ServerAction, ServerDriver, ServerEvent};
pub use error::ServerError;
pub use http::HealthResponse;
use roomcast_core::{ConnectionId, Environment};
use roomcast_proto::ServerMessage;
pub use server_error::DriverError;
pub use system_env::SystemEnv;
use tokio::{
    net::TcpListener,
    sync::{Mutex, RwLock},
};

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080")
    pub bind_address: String,
    /// Driver configuration (rooms, history, limits)
    pub driver: DriverConfig,
    /// Frames queued per connection before further frames are dropped
    pub outbound_buffer: usize,
    /// Largest inbound WebSocket message accepted, in bytes
    pub max_message_size: usize,
    /// Interval between server-initiated pings
    pub ping_interval: Duration,
    /// How long a client may stay silent before it is disconnected
    pub pong_timeout: Duration,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            driver: DriverConfig::default(),
            outbound_buffer: 1024,
            max_message_size: 64 * 1024,
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(60),
        }
    }
}

/// Shared state for all connections.
pub(crate) struct SharedState {
    /// The action-based driver. Held across event processing and action
    /// execution.
    driver: Mutex<ServerDriver<SystemEnv>>,
    /// Outbound handle per open connection
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
    /// Next connection ID to hand out
    next_connection_id: AtomicU64,
    /// When the server was bound
    started_at: std::time::Instant,
    /// Runtime configuration
    config: ServerRuntimeConfig,
}

impl SharedState {
    fn new(config: ServerRuntimeConfig) -> Self {
        let env = SystemEnv::new();
        let started_at = env.now();
        let driver = ServerDriver::new(env, config.driver.clone());

        Self {
            driver: Mutex::new(driver),
            connections: RwLock::new(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
            started_at,
            config,
        }
    }

    fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Process one event and execute its actions under the driver lock.
    async fn dispatch(&self, event: ServerEvent) {
        let mut driver = self.driver.lock().await;
        match driver.process_event(event) {
            Ok(actions) => self.execute_actions(actions).await,
            Err(DriverError::SessionNotFound(connection_id)) => {
                tracing::debug!("dropping event for closed connection {}", connection_id);
            },
            Err(e) => tracing::warn!("event processing error: {}", e),
        }
    }

    /// Execute server actions.
    async fn execute_actions(&self, actions: Vec<ServerAction>) {
        let connections = self.connections.read().await;

        for action in actions {
            match action {
                ServerAction::SendToConnection { connection_id, message } => {
                    let Some(frame) = encode(&message) else { continue };
                    match connections.get(&connection_id) {
                        Some(conn) => {
                            if !conn.send(frame) {
                                tracing::debug!(
                                    connection_id,
                                    kind = message.kind(),
                                    "frame dropped: outbound queue full or closed"
                                );
                            }
                        },
                        None => {
                            tracing::debug!("SendToConnection: connection {} gone", connection_id);
                        },
                    }
                },

                ServerAction::BroadcastToRoom { room_id, recipients, message } => {
                    let Some(frame) = encode(&message) else { continue };
                    for connection_id in recipients {
                        let Some(conn) = connections.get(&connection_id) else { continue };
                        if !conn.send(Arc::clone(&frame)) {
                            tracing::debug!(
                                connection_id,
                                %room_id,
                                kind = message.kind(),
                                "broadcast frame dropped: outbound queue full or closed"
                            );
                        }
                    }
                },

                ServerAction::CloseConnection { connection_id, reason } => {
                    tracing::info!("Closing connection {}: {}", connection_id, reason);
                    if let Some(conn) = connections.get(&connection_id) {
                        conn.close();
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
}

/// Serialize once; the same frame is shared by every recipient.
fn encode(message: &ServerMessage) -> Option<Arc<str>> {
    match message.encode() {
        Ok(text) => Some(Arc::from(text)),
        Err(e) => {
            tracing::error!(kind = message.kind(), "failed to encode server message: {}", e);
            None
        },
    }
}

/// Production Roomcast server.
///
/// Wraps `ServerDriver` with an axum HTTP/WebSocket listener and the system
/// environment.
pub struct Server {
    /// Bound TCP listener
    listener: TcpListener,
    /// State shared with every connection task
    state: Arc<SharedState>,
}

impl Server {
    /// Create and bind a new server.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_address).await.map_err(|e| {
            ServerError::Config(format!("failed to bind {}: {e}", config.bind_address))
        })?;

        Ok(Self { listener, state: Arc::new(SharedState::new(config)) })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(|e| ServerError::Transport(e.to_string()))
    }

    /// HTTP routes served by this server: `/`, `/health` and `/ws`.
    pub fn router(&self) -> axum::Router {
        http::router(Arc::clone(&self.state))
    }

    /// Run the server until the process is stopped.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Server starting on {}", self.local_addr()?);

        let router = self.router();
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_defaults() {
        let config = ServerRuntimeConfig::default();

        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.driver.default_room_id, "default-room");
        assert_eq!(config.driver.max_history, 100);
        assert!(config.pong_timeout > config.ping_interval);
    }

    #[test]
    fn connection_ids_are_unique() {
        let state = SharedState::new(ServerRuntimeConfig::default());

        let first = state.next_connection_id();
        let second = state.next_connection_id();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn bind_reports_bad_address() {
        let config =
            ServerRuntimeConfig { bind_address: "not-an-address".into(), ..Default::default() };

        let result = Server::bind(config).await;

        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
