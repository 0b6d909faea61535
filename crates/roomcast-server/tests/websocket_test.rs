//! End-to-end tests over a real WebSocket listener.

use std::{net::SocketAddr, time::Duration};

use futures::{SinkExt, StreamExt};
use roomcast_proto::{ErrorCode, ServerMessage};
use roomcast_server::{DriverConfig, Server, ServerRuntimeConfig};
use tokio::{net::TcpStream, sync::oneshot, time::timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn start(driver: DriverConfig) -> (SocketAddr, oneshot::Sender<()>) {
    let config =
        ServerRuntimeConfig { bind_address: "127.0.0.1:0".into(), driver, ..Default::default() };
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(server.run_until(async {
        let _ = shutdown_rx.await;
    }));

    (addr, shutdown_tx)
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws
}

async fn send(ws: &mut Client, text: &str) {
    ws.send(Message::text(text)).await.unwrap();
}

async fn recv(ws: &mut Client) -> ServerMessage {
    loop {
        let message = timeout(RECV_TIMEOUT, ws.next()).await.unwrap().unwrap().unwrap();
        if message.is_text() {
            return ServerMessage::decode(message.to_text().unwrap()).unwrap();
        }
    }
}

async fn recv_kinds(ws: &mut Client, count: usize) -> Vec<&'static str> {
    let mut kinds = Vec::with_capacity(count);
    for _ in 0..count {
        kinds.push(recv(ws).await.kind());
    }
    kinds
}

#[tokio::test]
async fn two_clients_exchange_messages() {
    let (addr, _shutdown) = start(DriverConfig::default()).await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;

    send(&mut alice, r#"{"type":"SET_USER","payload":{"userId":"u1"}}"#).await;
    assert_eq!(recv(&mut alice).await.kind(), "USER_SET");
    send(&mut alice, r#"{"type":"JOIN_ROOM","payload":{"roomId":"default-room"}}"#).await;
    assert_eq!(recv_kinds(&mut alice, 3).await, vec!["USER_JOINED", "ROOM_JOINED", "ROOM_USERS"]);

    send(&mut bob, r#"{"type":"SET_USER","payload":{"userId":"u2222222"}}"#).await;
    assert_eq!(recv(&mut bob).await.kind(), "USER_SET");
    send(&mut bob, r#"{"type":"JOIN_ROOM","payload":{"roomId":"default-room"}}"#).await;
    assert_eq!(recv_kinds(&mut bob, 3).await, vec!["USER_JOINED", "ROOM_JOINED", "ROOM_USERS"]);
    assert!(matches!(
        recv(&mut alice).await,
        ServerMessage::UserJoined(p) if p.user_id == "u2222222" && p.user_name == "User-u2222"
    ));

    send(&mut alice, r#"{"type":"CHAT_MESSAGE","payload":{"content":"hi"}}"#).await;
    for ws in [&mut alice, &mut bob] {
        assert!(matches!(
            recv(ws).await,
            ServerMessage::ChatMessage(m) if m.content == "hi" && m.sender_id == "u1"
        ));
    }

    bob.close(None).await.unwrap();
    assert!(matches!(
        recv(&mut alice).await,
        ServerMessage::UserLeft(p) if p.user_id == "u2222222"
    ));
}

#[tokio::test]
async fn malformed_frame_gets_error_and_connection_survives() {
    let (addr, _shutdown) = start(DriverConfig::default()).await;
    let mut client = connect(addr).await;

    send(&mut client, "not json at all").await;
    assert!(matches!(
        recv(&mut client).await,
        ServerMessage::Error(e) if e.code == ErrorCode::ProtocolError
    ));

    send(&mut client, r#"{"type":"SET_USER","payload":{"userId":"still-here"}}"#).await;
    assert_eq!(recv(&mut client).await.kind(), "USER_SET");
}

#[tokio::test]
async fn connections_over_limit_are_closed() {
    let (addr, _shutdown) =
        start(DriverConfig { max_connections: 1, ..Default::default() }).await;
    let mut first = connect(addr).await;
    let mut second = connect(addr).await;

    let closed = loop {
        match timeout(RECV_TIMEOUT, second.next()).await.unwrap() {
            Some(Ok(Message::Close(_)) | Err(_)) | None => break true,
            Some(Ok(Message::Text(_))) => break false,
            Some(Ok(_)) => {},
        }
    };
    assert!(closed, "second connection should be closed by the server");

    send(&mut first, r#"{"type":"SET_USER","payload":{"userId":"first"}}"#).await;
    assert_eq!(recv(&mut first).await.kind(), "USER_SET");
}
