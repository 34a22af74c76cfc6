use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use chirp_types::kv::{KvReply, KvRequest, decode_bytes};

use crate::storage::KvStore;

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<KvStore>,
}

/// GET /kv: upgrade to the request/reply WebSocket.
pub async fn kv_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_kv_connection(socket, state))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

async fn handle_kv_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    info!("Storage client connected");

    while let Some(Ok(msg)) = ws_rx.next().await {
        let text = match msg {
            Message::Text(t) => t,
            Message::Close(_) => break,
            _ => continue,
        };

        // Every text frame gets exactly one reply, even a malformed one, so
        // the client's request/reply pairing never drifts.
        let reply = match serde_json::from_str::<KvRequest>(&text) {
            Ok(request) => apply(&state.store, request),
            Err(e) => {
                warn!("Bad storage request: {}", e);
                KvReply::Error {
                    message: format!("bad request: {}", e),
                }
            }
        };

        let json = match serde_json::to_string(&reply) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode storage reply: {}", e);
                break;
            }
        };
        if ws_tx.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }

    info!("Storage client disconnected");
}

pub fn apply(store: &KvStore, request: KvRequest) -> KvReply {
    let result = match request {
        KvRequest::Put { key, value } => decode_pair(&key, &value).and_then(|(key, value)| {
            debug!("put {}", String::from_utf8_lossy(&key));
            store.put(key, value).map(|_| KvReply::Stored)
        }),
        KvRequest::Get { key } => decode_key(&key)
            .and_then(|key| store.get(&key))
            .map(|value| KvReply::value(value.as_deref())),
        KvRequest::Delete { key } => decode_key(&key).and_then(|key| {
            debug!("delete {}", String::from_utf8_lossy(&key));
            store.delete(&key).map(|existed| {
                if existed {
                    KvReply::Deleted
                } else {
                    KvReply::NotFound
                }
            })
        }),
    };

    result.unwrap_or_else(|e| KvReply::Error {
        message: e.to_string(),
    })
}

fn decode_key(key: &str) -> anyhow::Result<Vec<u8>> {
    decode_bytes(key).map_err(|e| anyhow::anyhow!("bad key encoding: {}", e))
}

fn decode_pair(key: &str, value: &str) -> anyhow::Result<(Vec<u8>, Vec<u8>)> {
    let key = decode_key(key)?;
    let value = decode_bytes(value).map_err(|e| anyhow::anyhow!("bad value encoding: {}", e))?;
    Ok((key, value))
}
