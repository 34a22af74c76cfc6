use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use chirp_kv_server::storage::KvStore;
use chirp_types::kv::{KvReply, KvRequest};

async fn spawn_server(store: Arc<KvStore>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, chirp_kv_server::router(store))
            .await
            .unwrap();
    });
    format!("ws://{}/kv", addr)
}

async fn next_reply<S>(ws: &mut S) -> KvReply
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match ws.next().await.expect("stream ended").expect("ws error") {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            _ => continue,
        }
    }
}

#[tokio::test]
async fn pipelined_gets_are_answered_in_request_order() {
    let store = Arc::new(KvStore::new());
    store.put(b"one".to_vec(), b"1".to_vec()).unwrap();
    store.put(b"three".to_vec(), b"3".to_vec()).unwrap();
    let url = spawn_server(store).await;

    let (mut ws, _) = connect_async(url).await.expect("failed to connect");
    for key in [&b"three"[..], b"two", b"one"] {
        let frame = serde_json::to_string(&KvRequest::get(key)).unwrap();
        ws.send(Message::text(frame)).await.unwrap();
    }

    assert_eq!(next_reply(&mut ws).await, KvReply::value(Some(b"3")));
    assert_eq!(next_reply(&mut ws).await, KvReply::value(None));
    assert_eq!(next_reply(&mut ws).await, KvReply::value(Some(b"1")));
}

#[tokio::test]
async fn writes_are_visible_to_the_shared_store() {
    let store = Arc::new(KvStore::new());
    let url = spawn_server(store.clone()).await;

    let (mut ws, _) = connect_async(url).await.expect("failed to connect");
    let put = serde_json::to_string(&KvRequest::put(b"user:alice", b"{}")).unwrap();
    ws.send(Message::text(put)).await.unwrap();
    assert_eq!(next_reply(&mut ws).await, KvReply::Stored);
    assert_eq!(store.get(b"user:alice").unwrap(), Some(b"{}".to_vec()));

    ws.send(Message::text("not json")).await.unwrap();
    assert!(matches!(next_reply(&mut ws).await, KvReply::Error { .. }));

    let delete = serde_json::to_string(&KvRequest::delete(b"user:alice")).unwrap();
    ws.send(Message::text(delete)).await.unwrap();
    assert_eq!(next_reply(&mut ws).await, KvReply::Deleted);
    assert!(store.is_empty());
}
