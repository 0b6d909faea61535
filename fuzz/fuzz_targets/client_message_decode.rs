//! Fuzz target for inbound frame decoding
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary input interpreted as UTF-8 text
//! - Structured: a known or unknown `type` tag around arbitrary JSON
//!
//! # Invariants
//!
//! - Decoding NEVER panics
//! - A successfully decoded message re-encodes and decodes to itself

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use roomcast_proto::ClientMessage;

#[derive(Debug, Arbitrary)]
enum Input {
    Raw(Vec<u8>),
    Tagged { tag: Tag, payload: String, flat: bool },
}

#[derive(Debug, Arbitrary)]
enum Tag {
    SetUser,
    JoinRoom,
    ChatMessage,
    LeaveRoom,
    CreateRoom,
    Other(String),
}

impl Tag {
    fn as_str(&self) -> &str {
        match self {
            Self::SetUser => "SET_USER",
            Self::JoinRoom => "JOIN_ROOM",
            Self::ChatMessage => "CHAT_MESSAGE",
            Self::LeaveRoom => "LEAVE_ROOM",
            Self::CreateRoom => "CREATE_ROOM",
            Self::Other(tag) => tag,
        }
    }
}

fuzz_target!(|input: Input| {
    let text = match input {
        Input::Raw(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Input::Tagged { tag, payload, flat } => {
            let tag = json_string(tag.as_str());
            if flat {
                format!(r#"{{"type":{tag},"content":{payload}}}"#)
            } else {
                format!(r#"{{"type":{tag},"payload":{payload}}}"#)
            }
        },
    };

    if let Ok(message) = ClientMessage::decode(&text) {
        let encoded = message.encode().expect("decoded messages always encode");
        let decoded = ClientMessage::decode(&encoded).expect("encoded messages always decode");
        assert_eq!(decoded, message);
    }
});

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
