use std::collections::{HashMap, HashSet};

use chirp_types::models::{Chirp, ChirpId};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

pub type SubscriptionId = u64;

struct LogEntry {
    id: ChirpId,
    author: String,
    created_at: DateTime<Utc>,
}

struct Subscriber {
    session_id: Uuid,
    follows: HashSet<String>,
    tx: mpsc::UnboundedSender<Chirp>,
}

/// Fan-out of new chirps to open monitor calls.
///
/// Holds the append-only event log (one entry per chirp, in id order) and the
/// live subscribers. Every method runs under the service lock, so appending
/// to the log and delivering to subscribers happen in the same critical
/// section as the post that produced the chirp.
#[derive(Default)]
pub struct MonitorHub {
    log: Vec<LogEntry>,
    subscribers: HashMap<SubscriptionId, Subscriber>,
    next_subscription: SubscriptionId,
}

impl MonitorHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the log without delivering. Used when replaying storage.
    pub fn record(&mut self, chirp: &Chirp) {
        self.log.push(LogEntry {
            id: chirp.id,
            author: chirp.username.clone(),
            created_at: chirp.created_at,
        });
    }

    /// Append a freshly committed chirp and push it to every subscriber that
    /// follows its author. Subscribers whose receiver is gone are dropped.
    pub fn publish(&mut self, chirp: &Chirp) {
        self.record(chirp);

        self.subscribers.retain(|id, sub| {
            if sub.tx.is_closed() {
                debug!("Pruning closed monitor subscription {}", id);
                return false;
            }
            if !sub.follows.contains(&chirp.username) {
                return true;
            }
            if sub.tx.send(chirp.clone()).is_err() {
                debug!("Monitor subscription {} went away during delivery", id);
                return false;
            }
            true
        });
    }

    /// Register a live subscriber. The follow set is fixed for its lifetime.
    pub fn subscribe(
        &mut self,
        session_id: Uuid,
        follows: HashSet<String>,
    ) -> (SubscriptionId, mpsc::UnboundedReceiver<Chirp>) {
        self.prune_closed();
        let (tx, rx) = mpsc::unbounded_channel();
        self.next_subscription += 1;
        let id = self.next_subscription;
        self.subscribers.insert(
            id,
            Subscriber {
                session_id,
                follows,
                tx,
            },
        );
        debug!("Monitor subscription {} opened for session {}", id, session_id);
        (id, rx)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        match self.subscribers.remove(&id) {
            Some(sub) => {
                debug!("Monitor subscription {} closed for session {}", id, sub.session_id);
                true
            }
            None => false,
        }
    }

    /// Open subscribers. Ones whose receiver is gone are dropped first.
    pub fn subscriber_count(&mut self) -> usize {
        self.prune_closed();
        self.subscribers.len()
    }

    fn prune_closed(&mut self) {
        self.subscribers.retain(|id, sub| {
            let open = !sub.tx.is_closed();
            if !open {
                debug!("Pruning closed monitor subscription {}", id);
            }
            open
        });
    }

    /// Ids of logged chirps created strictly after `since` by an author in
    /// `follows`, ascending.
    pub fn replay_since(&self, follows: &HashSet<String>, since: DateTime<Utc>) -> Vec<ChirpId> {
        // Timestamps are non-decreasing along the log.
        let start = self.log.partition_point(|entry| entry.created_at <= since);
        self.log[start..]
            .iter()
            .filter(|entry| follows.contains(&entry.author))
            .map(|entry| entry.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn chirp(id: ChirpId, author: &str, created_at: DateTime<Utc>) -> Chirp {
        Chirp {
            id,
            username: author.into(),
            text: format!("#{}", id),
            created_at,
            parent_id: 0,
        }
    }

    fn follows(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn delivers_only_followed_authors() {
        let mut hub = MonitorHub::new();
        let (_, mut rx) = hub.subscribe(Uuid::new_v4(), follows(&["bob"]));
        let now = Utc::now();

        hub.publish(&chirp(1, "bob", now));
        hub.publish(&chirp(2, "carol", now));
        hub.publish(&chirp(3, "bob", now));

        assert_eq!(rx.try_recv().unwrap().id, 1);
        assert_eq!(rx.try_recv().unwrap().id, 3);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let mut hub = MonitorHub::new();
        let (_, rx) = hub.subscribe(Uuid::new_v4(), follows(&["bob"]));
        let (_, _other) = hub.subscribe(Uuid::new_v4(), follows(&["carol"]));
        drop(rx);

        hub.publish(&chirp(1, "dave", Utc::now()));
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn closed_receivers_are_pruned_without_a_post() {
        let mut hub = MonitorHub::new();
        let (_, rx) = hub.subscribe(Uuid::new_v4(), follows(&["bob"]));
        drop(rx);
        assert_eq!(hub.subscriber_count(), 0);

        let (_, rx) = hub.subscribe(Uuid::new_v4(), follows(&["bob"]));
        drop(rx);
        let (_, _open) = hub.subscribe(Uuid::new_v4(), follows(&["bob"]));
        assert_eq!(hub.subscribers.len(), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut hub = MonitorHub::new();
        let (id, mut rx) = hub.subscribe(Uuid::new_v4(), follows(&["bob"]));
        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));

        hub.publish(&chirp(1, "bob", Utc::now()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn replay_starts_strictly_after_the_timestamp() {
        let mut hub = MonitorHub::new();
        let t0 = Utc::now();
        hub.record(&chirp(1, "bob", t0));
        hub.record(&chirp(2, "bob", t0 + Duration::seconds(1)));
        hub.record(&chirp(3, "carol", t0 + Duration::seconds(2)));
        hub.record(&chirp(4, "bob", t0 + Duration::seconds(3)));

        assert_eq!(hub.replay_since(&follows(&["bob"]), t0), vec![2, 4]);
        assert_eq!(hub.replay_since(&follows(&["bob", "carol"]), t0 - Duration::seconds(1)), vec![1, 2, 3, 4]);
        assert!(hub.replay_since(&follows(&["bob"]), t0 + Duration::seconds(3)).is_empty());
    }
}
