use std::net::TcpStream;
use std::sync::Mutex;

use chirp_types::kv::{KvReply, KvRequest, decode_bytes};
use tracing::{debug, info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::store::{KeyValueStore, StorageError};

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Limits on get requests written ahead of their replies.
const GET_WINDOW: usize = 64;
const GET_WINDOW_BYTES: usize = 16 * 1024;

/// Client for the key-value storage server.
///
/// Holds one WebSocket connection that is reused across calls. A transport
/// failure drops the connection; the next call dials again.
pub struct RemoteStore {
    url: String,
    conn: Mutex<Option<Socket>>,
}

impl RemoteStore {
    /// Connect eagerly so a misconfigured URL fails at startup.
    pub fn connect(url: &str) -> Result<Self, StorageError> {
        let socket = open_socket(url)?;
        info!("Connected to storage tier at {}", url);
        Ok(Self {
            url: url.to_string(),
            conn: Mutex::new(Some(socket)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn with_socket<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Socket) -> Result<T, StorageError>,
    {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| StorageError::Connection(format!("connection lock poisoned: {}", e)))?;

        if guard.is_none() {
            debug!("Reconnecting to storage tier at {}", self.url);
            *guard = Some(open_socket(&self.url)?);
        }
        let socket = guard
            .as_mut()
            .ok_or_else(|| StorageError::Connection("no storage connection".into()))?;

        let result = f(socket);
        if let Err(e) = &result {
            if e.is_transport() {
                warn!("Dropping storage connection after error: {}", e);
                *guard = None;
            }
        }
        result
    }
}

impl KeyValueStore for RemoteStore {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.with_socket(|socket| {
            send(socket, &KvRequest::put(key, value))?;
            match recv(socket)? {
                KvReply::Stored => Ok(()),
                other => Err(unexpected(other)),
            }
        })
    }

    fn get(&self, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>, StorageError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        self.with_socket(|socket| {
            // The server replies while it reads, so only a bounded window of
            // requests may be outstanding or both ends stall on full buffers.
            let mut values = Vec::with_capacity(keys.len());
            let mut refused = None;
            for window in get_windows(keys) {
                for key in window {
                    write(socket, &KvRequest::get(key))?;
                }
                socket
                    .flush()
                    .map_err(|e| StorageError::Connection(e.to_string()))?;

                // Drain every reply even after a refusal so the next call starts in sync.
                for _ in window {
                    let reply = recv(socket)?;
                    if refused.is_some() {
                        continue;
                    }
                    match reply {
                        KvReply::Value { value: Some(encoded) } => {
                            let bytes = decode_bytes(&encoded).map_err(|e| {
                                StorageError::Protocol(format!("bad value encoding: {}", e))
                            })?;
                            values.push(Some(bytes));
                        }
                        KvReply::Value { value: None } => values.push(None),
                        other => refused = Some(unexpected(other)),
                    }
                }
            }
            match refused {
                Some(e) => Err(e),
                None => Ok(values),
            }
        })
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        self.with_socket(|socket| {
            send(socket, &KvRequest::delete(key))?;
            match recv(socket)? {
                KvReply::Deleted => Ok(()),
                KvReply::NotFound => Err(StorageError::NotFound),
                other => Err(unexpected(other)),
            }
        })
    }
}

/// Split a batch into runs of at most `GET_WINDOW` keys and, past the first
/// key of a run, `GET_WINDOW_BYTES` of key data.
fn get_windows(keys: &[Vec<u8>]) -> Vec<&[Vec<u8>]> {
    let mut windows = Vec::new();
    let mut start = 0;
    while start < keys.len() {
        let mut end = start + 1;
        let mut bytes = keys[start].len();
        while end < keys.len()
            && end - start < GET_WINDOW
            && bytes + keys[end].len() <= GET_WINDOW_BYTES
        {
            bytes += keys[end].len();
            end += 1;
        }
        windows.push(&keys[start..end]);
        start = end;
    }
    windows
}

fn open_socket(url: &str) -> Result<Socket, StorageError> {
    let (socket, _response) =
        tungstenite::connect(url).map_err(|e| StorageError::Connection(format!("{}: {}", url, e)))?;
    Ok(socket)
}

fn write(socket: &mut Socket, request: &KvRequest) -> Result<(), StorageError> {
    let text = serde_json::to_string(request).map_err(|e| StorageError::Protocol(e.to_string()))?;
    socket
        .write(Message::text(text))
        .map_err(|e| StorageError::Connection(e.to_string()))
}

fn send(socket: &mut Socket, request: &KvRequest) -> Result<(), StorageError> {
    write(socket, request)?;
    socket
        .flush()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

fn recv(socket: &mut Socket) -> Result<KvReply, StorageError> {
    loop {
        let message = socket
            .read()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match message {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str())
                    .map_err(|e| StorageError::Protocol(format!("bad reply: {}", e)));
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            Message::Binary(_) => {
                return Err(StorageError::Protocol("unexpected binary frame".into()));
            }
            Message::Close(_) => {
                return Err(StorageError::Connection("storage tier closed the connection".into()));
            }
        }
    }
}

/// Replies that do not answer the request. `Error` is the server refusing the
/// request and leaves the connection usable.
fn unexpected(reply: KvReply) -> StorageError {
    match reply {
        KvReply::Error { message } => StorageError::Rejected(message),
        other => StorageError::Protocol(format!("unexpected reply: {:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_windows_bound_count_and_bytes() {
        let short: Vec<Vec<u8>> = (0..150).map(|i| format!("chirp:{}", i).into_bytes()).collect();
        let sizes: Vec<usize> = get_windows(&short).iter().map(|w| w.len()).collect();
        assert_eq!(sizes, vec![64, 64, 22]);

        let long: Vec<Vec<u8>> = (0..40).map(|_| vec![b'k'; 1024]).collect();
        let windows = get_windows(&long);
        assert!(windows.iter().all(|w| w.len() <= GET_WINDOW_BYTES / 1024));
        assert_eq!(windows.iter().map(|w| w.len()).sum::<usize>(), 40);

        let huge = vec![vec![b'k'; GET_WINDOW_BYTES * 2], b"a".to_vec()];
        let sizes: Vec<usize> = get_windows(&huge).iter().map(|w| w.len()).collect();
        assert_eq!(sizes, vec![1, 1]);
    }
}
