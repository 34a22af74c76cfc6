use std::time::Duration;

use axum::{
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

use chirp_service::{MonitorReplay, Session, Subscription};
use chirp_types::events::MonitorEvent;

use crate::AppState;
use crate::error::{ApiError, blocking};

/// Server sends a Ping every 15 seconds and drops the connection after two
/// consecutive missed Pongs.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub struct MonitorQuery {
    /// Replay chirps created after this instant instead of streaming live.
    pub since: Option<DateTime<Utc>>,
}

/// GET /monitor/{username}[?since=]
///
/// The login and the subscription happen before the upgrade, so an unknown
/// user gets a plain 404 and nothing posted after `Ready` can be missed.
pub async fn monitor(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<MonitorQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let session = blocking(&state, move |service| service.login(&username)).await?;

    let response = match query.since {
        Some(since) => {
            let replay_session = session.clone();
            let replay = blocking(&state, move |service| {
                service.monitor_since(&replay_session, since)
            })
            .await?;
            ws.on_upgrade(move |socket| send_replay(socket, session, replay))
        }
        None => {
            let subscription = blocking(&state, move |service| service.monitor(&session)).await?;
            ws.on_upgrade(move |socket| run_live(socket, subscription))
        }
    };
    Ok(response)
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &MonitorEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}

fn ready(session: &Session) -> MonitorEvent {
    MonitorEvent::Ready {
        username: session.username().to_string(),
        session_id: session.id(),
    }
}

async fn send_replay(socket: WebSocket, session: Session, replay: MonitorReplay) {
    let (mut sender, _receiver) = socket.split();
    info!(
        "{} ({}) replaying {} chirps",
        session.username(),
        session.id(),
        replay.chirps.len()
    );

    if send_event(&mut sender, &ready(&session)).await.is_err() {
        return;
    }
    for chirp in replay.chirps {
        if send_event(&mut sender, &MonitorEvent::Chirp(chirp)).await.is_err() {
            return;
        }
    }
    let done = MonitorEvent::ReplayComplete {
        cursor: replay.cursor,
    };
    if send_event(&mut sender, &done).await.is_err() {
        return;
    }
    let _ = sender.send(Message::Close(None)).await;
}

async fn run_live(socket: WebSocket, mut subscription: Subscription) {
    let (mut sender, mut receiver) = socket.split();
    let session = subscription.session().clone();
    info!("{} ({}) started monitoring", session.username(), session.id());

    if send_event(&mut sender, &ready(&session)).await.is_err() {
        return;
    }

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut pong_received = true;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            delivered = subscription.recv() => {
                let Some(chirp) = delivered else { break };
                if send_event(&mut sender, &MonitorEvent::Chirp(chirp)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Pong(_))) => pong_received = true,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = heartbeat.tick() => {
                if std::mem::replace(&mut pong_received, false) {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        warn!(
                            "{} ({}) missed {} pongs, dropping monitor",
                            session.username(),
                            session.id(),
                            missed_heartbeats
                        );
                        break;
                    }
                }
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    // Dropping the subscription unregisters it.
    drop(subscription);
    info!("{} ({}) stopped monitoring", session.username(), session.id());
}
