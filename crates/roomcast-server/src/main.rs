//! Roomcast server binary.
//!
//! # Usage
//!
//! ```bash
//! # Default room only
//! roomcast-server --bind 0.0.0.0:8080
//!
//! # Extra rooms and a shorter history
//! roomcast-server --room lobby=Lobby --room dev=Development --max-history 50
//! ```

use clap::Parser;
use roomcast_server::{DriverConfig, Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Roomcast chat relay
#[derive(Parser, Debug)]
#[command(name = "roomcast-server")]
#[command(about = "Room-based WebSocket chat relay")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// ID of the room that always exists
    #[arg(long, default_value = roomcast_core::DEFAULT_ROOM_ID)]
    default_room_id: String,

    /// Display name of the default room
    #[arg(long, default_value = roomcast_core::DEFAULT_ROOM_NAME)]
    default_room_name: String,

    /// Messages retained per room
    #[arg(long, default_value_t = roomcast_core::MAX_HISTORY)]
    max_history: usize,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Maximum live rooms, the default room included
    #[arg(long, default_value = "1000")]
    max_rooms: usize,

    /// Extra room to create at startup, as ID=NAME (repeatable)
    #[arg(long = "room", value_name = "ID=NAME", value_parser = parse_room)]
    rooms: Vec<(String, String)>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_room(spec: &str) -> Result<(String, String), String> {
    match spec.split_once('=') {
        Some((id, name)) if !id.is_empty() && !name.is_empty() => {
            Ok((id.to_string(), name.to_string()))
        },
        _ => Err(format!("expected ID=NAME, got {spec:?}")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Roomcast server starting");
    tracing::info!("Binding to {}", args.bind);

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        driver: DriverConfig {
            default_room_id: args.default_room_id,
            default_room_name: args.default_room_name,
            max_history: args.max_history,
            max_connections: args.max_connections,
            max_rooms: args.max_rooms,
            seed_rooms: args.rooms,
        },
        ..Default::default()
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
