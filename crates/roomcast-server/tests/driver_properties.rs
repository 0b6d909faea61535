//! Property-based tests for the relay driver.
//!
//! Random interleavings of client operations across a handful of connections
//! and rooms, checked against the membership and history invariants after
//! every step.

use std::collections::HashSet;

use proptest::prelude::*;
use roomcast_harness::{SimEnv, SimServer};
use roomcast_proto::ServerMessage;
use roomcast_server::DriverConfig;

const CONNECTIONS: usize = 4;
const ROOMS: [&str; 4] = ["default-room", "a", "b", "missing"];
const MAX_HISTORY: usize = 5;

#[derive(Debug, Clone)]
enum Op {
    SetUser { conn: usize, user: u8 },
    Join { conn: usize, room: usize },
    Chat { conn: usize },
    Leave { conn: usize },
    Create { conn: usize, room: usize },
    Garbage { conn: usize },
    Reconnect { conn: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let conn = 0..CONNECTIONS;
    let room = 0..ROOMS.len();
    prop_oneof![
        1 => (conn.clone(), any::<u8>()).prop_map(|(conn, user)| Op::SetUser { conn, user }),
        3 => (conn.clone(), room.clone()).prop_map(|(conn, room)| Op::Join { conn, room }),
        3 => conn.clone().prop_map(|conn| Op::Chat { conn }),
        1 => conn.clone().prop_map(|conn| Op::Leave { conn }),
        1 => (conn.clone(), room).prop_map(|(conn, room)| Op::Create { conn, room }),
        1 => conn.clone().prop_map(|conn| Op::Garbage { conn }),
        1 => conn.prop_map(|conn| Op::Reconnect { conn }),
    ]
}

fn frame_for(op: &Op) -> Option<String> {
    match op {
        Op::SetUser { user, .. } => {
            Some(format!(r#"{{"type":"SET_USER","payload":{{"userId":"user-{user}"}}}}"#))
        },
        Op::Join { room, .. } => {
            Some(format!(r#"{{"type":"JOIN_ROOM","payload":{{"roomId":"{}"}}}}"#, ROOMS[*room]))
        },
        Op::Chat { .. } => Some(r#"{"type":"CHAT_MESSAGE","payload":{"content":"x"}}"#.into()),
        Op::Leave { .. } => Some(r#"{"type":"LEAVE_ROOM"}"#.into()),
        Op::Create { room, .. } => {
            Some(format!(r#"{{"type":"CREATE_ROOM","payload":{{"roomId":"{}"}}}}"#, ROOMS[*room]))
        },
        Op::Garbage { .. } => Some("}{".into()),
        Op::Reconnect { .. } => None,
    }
}

fn conn_of(op: &Op) -> usize {
    match op {
        Op::SetUser { conn, .. }
        | Op::Join { conn, .. }
        | Op::Chat { conn }
        | Op::Leave { conn }
        | Op::Create { conn, .. }
        | Op::Garbage { conn }
        | Op::Reconnect { conn } => *conn,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: the default room survives, empty non-default rooms never
    /// outlive their creator, histories stay bounded, and every connection is in at most one
    /// room which agrees with its session.
    #[test]
    fn prop_registry_invariants_hold(
        seed in any::<u64>(),
        ops in prop::collection::vec(op_strategy(), 1..80),
    ) {
        let config = DriverConfig { max_history: MAX_HISTORY, ..Default::default() };
        let mut server = SimServer::with_config(SimEnv::with_seed(seed), config);
        let mut conns: Vec<u64> = (0..CONNECTIONS).map(|_| server.connect().unwrap()).collect();

        for op in &ops {
            let slot = conn_of(op);
            match frame_for(op) {
                Some(frame) => server.send_text(conns[slot], frame).unwrap(),
                None => {
                    server.disconnect(conns[slot]).unwrap();
                    conns[slot] = server.connect().unwrap();
                },
            }

            let driver = server.driver();
            prop_assert!(driver.has_room("default-room"));

            let mut seen = HashSet::new();
            for room_id in driver.rooms().room_ids() {
                let room = driver.rooms().get(room_id).unwrap();
                prop_assert!(room.history().len() <= MAX_HISTORY);
                if room_id != "default-room" && room.is_empty() {
                    // Only rooms created and never joined may be empty, and
                    // only while their creator is still connected.
                    prop_assert!(room.history().is_empty());
                    prop_assert!(room.created_by().is_some_and(|c| driver.session(c).is_some()));
                }
                for conn in room.connections() {
                    prop_assert!(seen.insert(conn), "connection {} in two rooms", conn);
                    let session = driver.session(conn).unwrap();
                    prop_assert_eq!(session.current_room.as_deref(), Some(room_id));
                }
            }

            for &conn in &conns {
                if let Some(room_id) = driver.session(conn).and_then(|s| s.current_room.clone()) {
                    prop_assert!(driver.sessions_in_room(&room_id).any(|c| c == conn));
                }
            }
        }
    }

    /// Property: a leaving connection never sees its own USER_LEFT, and a
    /// joining connection always sees its own USER_JOINED.
    #[test]
    fn prop_presence_visibility(
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let mut server = SimServer::new();
        let mut conns: Vec<u64> = (0..CONNECTIONS).map(|_| server.connect().unwrap()).collect();

        for op in &ops {
            let slot = conn_of(op);
            let Some(frame) = frame_for(op) else {
                server.disconnect(conns[slot]).unwrap();
                conns[slot] = server.connect().unwrap();
                continue;
            };

            let conn = conns[slot];
            let user_id = server.driver().session(conn).and_then(|s| s.user_id.clone());
            for &other in &conns {
                server.take_messages(other);
            }

            server.send_text(conn, frame).unwrap();
            let received = server.take_messages(conn);

            prop_assert!(!received.iter().any(|m| matches!(m, ServerMessage::UserLeft(_))));

            if matches!(op, Op::Join { .. }) && user_id.is_some() {
                prop_assert!(received.iter().any(|m| matches!(
                    m,
                    ServerMessage::UserJoined(p) if Some(&p.user_id) == user_id.as_ref()
                )));
            }
        }
    }
}
