use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Chirp;

/// Events sent over a monitor WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MonitorEvent {
    /// The subscription is registered; every chirp posted from here on is delivered.
    Ready { username: String, session_id: Uuid },

    /// A chirp from a followed author.
    Chirp(Chirp),

    /// Historical replay finished. `cursor` is the creation time of the newest
    /// replayed chirp, suitable as the next `since`.
    ReplayComplete { cursor: DateTime<Utc> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_adjacently_tagged() {
        let event = MonitorEvent::Chirp(Chirp {
            id: 7,
            username: "bob".into(),
            text: "hello".into(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            parent_id: 0,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Chirp");
        assert_eq!(json["data"]["id"], 7);
        assert_eq!(json["data"]["username"], "bob");
    }
}
