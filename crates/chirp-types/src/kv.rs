//! Frames exchanged with the key-value storage tier over its WebSocket.
//!
//! Keys and values are opaque bytes, carried as standard base64 so frames stay
//! plain JSON text. Every request is answered by exactly one reply, in order.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum KvRequest {
    Put { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum KvReply {
    Stored,
    /// `None` when the key is absent.
    Value { value: Option<String> },
    Deleted,
    NotFound,
    Error { message: String },
}

impl KvRequest {
    pub fn put(key: &[u8], value: &[u8]) -> Self {
        Self::Put {
            key: B64.encode(key),
            value: B64.encode(value),
        }
    }

    pub fn get(key: &[u8]) -> Self {
        Self::Get { key: B64.encode(key) }
    }

    pub fn delete(key: &[u8]) -> Self {
        Self::Delete { key: B64.encode(key) }
    }
}

impl KvReply {
    pub fn value(value: Option<&[u8]>) -> Self {
        Self::Value {
            value: value.map(|v| B64.encode(v)),
        }
    }
}

pub fn decode_bytes(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    B64.decode(encoded)
}
