//! Fuzz target for the relay driver
//!
//! # Strategy
//!
//! - Several connections sending well-formed and garbage frames in any order
//! - Connections closing and reopening mid-stream
//! - Tiny history bound so eviction is exercised constantly
//!
//! # Invariants
//!
//! - The driver NEVER panics and never returns an error for a known connection
//! - The default room always exists
//! - No non-default room is empty unless it was created, never joined, and
//!   its creator is still connected
//! - Every connection is a member of at most one room
//! - No room history exceeds its bound

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use roomcast_harness::{SimEnv, SimServer};
use roomcast_server::DriverConfig;

const MAX_HISTORY: usize = 3;
const ROOMS: [&str; 3] = ["default-room", "x", "y"];

#[derive(Debug, Arbitrary)]
struct Scenario {
    seed: u64,
    steps: Vec<Step>,
}

#[derive(Debug, Arbitrary)]
enum Step {
    SetUser { conn: u8, user: u8 },
    Join { conn: u8, room: u8 },
    Chat { conn: u8, content: String },
    Leave { conn: u8 },
    Create { conn: u8, room: u8 },
    Raw { conn: u8, text: String },
    Reconnect { conn: u8 },
}

fuzz_target!(|scenario: Scenario| {
    let config = DriverConfig { max_history: MAX_HISTORY, ..Default::default() };
    let mut server = SimServer::with_config(SimEnv::with_seed(scenario.seed), config);
    let mut conns: Vec<u64> = (0..4).map(|_| server.connect().unwrap()).collect();

    for step in scenario.steps.into_iter().take(256) {
        let (slot, frame) = match step {
            Step::SetUser { conn, user } => {
                (conn, Some(format!(r#"{{"type":"SET_USER","payload":{{"userId":"u{user}"}}}}"#)))
            },
            Step::Join { conn, room } => (
                conn,
                Some(format!(
                    r#"{{"type":"JOIN_ROOM","payload":{{"roomId":"{}"}}}}"#,
                    ROOMS[room as usize % ROOMS.len()]
                )),
            ),
            Step::Chat { conn, content } => {
                let payload = json_string(&content);
                (conn, Some(format!(r#"{{"type":"CHAT_MESSAGE","payload":{{"content":{payload}}}}}"#)))
            },
            Step::Leave { conn } => (conn, Some(r#"{"type":"LEAVE_ROOM"}"#.to_string())),
            Step::Create { conn, room } => (
                conn,
                Some(format!(
                    r#"{{"type":"CREATE_ROOM","payload":{{"roomId":"{}"}}}}"#,
                    ROOMS[room as usize % ROOMS.len()]
                )),
            ),
            Step::Raw { conn, text } => (conn, Some(text)),
            Step::Reconnect { conn } => (conn, None),
        };

        let slot = slot as usize % conns.len();
        match frame {
            Some(frame) => server.send_text(conns[slot], frame).unwrap(),
            None => {
                server.disconnect(conns[slot]).unwrap();
                conns[slot] = server.connect().unwrap();
            },
        }

        let driver = server.driver();
        assert!(driver.has_room("default-room"));

        let mut seen = HashSet::new();
        for room_id in driver.rooms().room_ids() {
            let room = driver.rooms().get(room_id).unwrap();
            assert!(room.history().len() <= MAX_HISTORY);
            if room_id != "default-room" && room.is_empty() {
                assert!(room.history().is_empty());
                assert!(room.created_by().is_some_and(|c| driver.session(c).is_some()));
            }
            for conn in room.connections() {
                assert!(seen.insert(conn), "connection {conn} in two rooms");
            }
        }
    }
});

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
