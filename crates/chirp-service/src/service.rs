use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chirp_backend::{Backend, KeyValueStore};
use chirp_types::models::{Chirp, ChirpId, User};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chirps::ChirpStore;
use crate::error::{Result, ServiceError};
use crate::follows::FollowGraph;
use crate::monitor::{MonitorHub, SubscriptionId};
use crate::session::Session;
use crate::users::UserDirectory;

struct ServiceState {
    users: UserDirectory,
    chirps: ChirpStore,
    follows: FollowGraph,
    monitor: MonitorHub,
}

struct ServiceInner {
    backend: Backend,
    state: Mutex<ServiceState>,
}

/// The service façade. Cheap to clone; every clone shares the same state.
///
/// Each call takes the state lock for its whole duration, storage writes
/// included, so posts are linearized: id assignment, commit and fan-out to
/// monitors happen as one step.
#[derive(Clone)]
pub struct ChirpService {
    inner: Arc<ServiceInner>,
}

impl ChirpService {
    /// Open the service over `store`, rebuilding chirp state from whatever is
    /// already stored. Users and follow lists load lazily.
    pub fn open(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let backend = Backend::new(store);

        let counter = backend.get_chirp_counter()?;
        let records = if counter == 0 {
            Vec::new()
        } else {
            backend.get_chirps(1..=counter)?
        };

        let mut monitor = MonitorHub::new();
        for record in &records {
            monitor.record(&record.clone().into_chirp());
        }
        let restored = records.len();
        let chirps = ChirpStore::restore(records, counter);

        info!("Chirp service opened ({} chirps restored, last id {})", restored, chirps.last_id());
        Ok(Self {
            inner: Arc::new(ServiceInner {
                backend,
                state: Mutex::new(ServiceState {
                    users: UserDirectory::new(),
                    chirps,
                    follows: FollowGraph::new(),
                    monitor,
                }),
            }),
        })
    }

    fn with_state<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut ServiceState, &Backend) -> Result<T>,
    {
        let mut state = self
            .inner
            .state
            .lock()
            .map_err(|e| ServiceError::Internal(format!("service state lock poisoned: {}", e)))?;
        f(&mut state, &self.inner.backend)
    }

    pub fn register_user(&self, username: &str) -> Result<User> {
        self.with_state(|state, backend| state.users.register(backend, username, Utc::now()))
    }

    pub fn login(&self, username: &str) -> Result<Session> {
        self.with_state(|state, backend| {
            if !state.users.is_registered(backend, username)? {
                return Err(ServiceError::NotFound(format!("user {}", username)));
            }
            let session = Session::new(username);
            debug!("{} logged in (session {})", username, session.id());
            Ok(session)
        })
    }

    /// Post a chirp as `username`. Open monitors following the author
    /// receive it before this returns.
    pub fn chirp(&self, username: &str, text: &str, parent_id: ChirpId) -> Result<Chirp> {
        self.with_state(|state, backend| {
            require_text(text)?;
            require_author(state, backend, username)?;
            let chirp = state
                .chirps
                .post(backend, username, text, parent_id, Utc::now())
                .inspect_err(|e| warn!("Post by {} failed: {}", username, e))?;
            state.monitor.publish(&chirp);
            Ok(chirp)
        })
    }

    /// Replace the text of a chirp. Any registered user may edit.
    pub fn edit_chirp(&self, username: &str, id: ChirpId, text: &str) -> Result<Chirp> {
        self.with_state(|state, backend| {
            require_text(text)?;
            require_author(state, backend, username)?;
            state.chirps.edit(backend, id, text)
        })
    }

    pub fn delete_chirp(&self, username: &str, id: ChirpId) -> Result<()> {
        self.with_state(|state, backend| {
            require_author(state, backend, username)?;
            state.chirps.delete(backend, id)
        })
    }

    pub fn read(&self, id: ChirpId) -> Result<Vec<Chirp>> {
        self.with_state(|state, _| state.chirps.read(id))
    }

    pub fn follow(&self, username: &str, to_follow: &str) -> Result<()> {
        self.with_state(|state, backend| {
            if username.is_empty() || to_follow.is_empty() {
                return Err(ServiceError::InvalidArgument("username is empty".into()));
            }
            for name in [username, to_follow] {
                if !state.users.is_registered(backend, name)? {
                    return Err(ServiceError::NotFound(format!("user {}", name)));
                }
            }
            state.follows.follow(backend, username, to_follow)
        })
    }

    /// Sorted followees of `username`.
    pub fn following(&self, username: &str) -> Result<Vec<String>> {
        self.with_state(|state, backend| {
            require_registered(state, backend, username)?;
            Ok(state
                .follows
                .followees(backend, username)?
                .iter()
                .cloned()
                .collect())
        })
    }

    /// Ids of the still-present chirps `username` authored, ascending.
    pub fn user_chirps(&self, username: &str) -> Result<Vec<ChirpId>> {
        self.with_state(|state, backend| {
            require_registered(state, backend, username)?;
            Ok(state.chirps.authored_by(username))
        })
    }

    /// Open a live monitor. The follow set is captured now; every chirp by a
    /// followed author posted after this returns is delivered exactly once,
    /// in id order.
    pub fn monitor(&self, session: &Session) -> Result<Subscription> {
        let (id, rx) = self.with_state(|state, backend| {
            let follows = followed_set(state, backend, session.username())?;
            Ok(state.monitor.subscribe(session.id(), follows))
        })?;

        Ok(Subscription {
            id,
            session: session.clone(),
            rx,
            inner: self.inner.clone(),
        })
    }

    /// Replay the still-present chirps by followed authors created strictly
    /// after `since`, in id order.
    pub fn monitor_since(&self, session: &Session, since: DateTime<Utc>) -> Result<MonitorReplay> {
        self.with_state(|state, backend| {
            let follows = followed_set(state, backend, session.username())?;
            let chirps: Vec<Chirp> = state
                .monitor
                .replay_since(&follows, since)
                .into_iter()
                .filter_map(|id| state.chirps.get(id).cloned())
                .collect();
            let cursor = chirps.last().map_or(since, |chirp| chirp.created_at);

            debug!(
                "Replayed {} chirps since {} for session {}",
                chirps.len(),
                since,
                session.id()
            );
            Ok(MonitorReplay { chirps, cursor })
        })
    }

    /// Number of open live monitors.
    pub fn monitor_count(&self) -> Result<usize> {
        self.with_state(|state, _| Ok(state.monitor.subscriber_count()))
    }
}

/// Mutations need a registered acting user; an unknown one is a bad argument.
fn require_author(state: &mut ServiceState, backend: &Backend, username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(ServiceError::InvalidArgument("username is empty".into()));
    }
    if !state.users.is_registered(backend, username)? {
        return Err(ServiceError::InvalidArgument(format!("user {} is not registered", username)));
    }
    Ok(())
}

fn require_text(text: &str) -> Result<()> {
    if text.is_empty() {
        return Err(ServiceError::InvalidArgument("chirp text is empty".into()));
    }
    Ok(())
}

fn require_registered(state: &mut ServiceState, backend: &Backend, username: &str) -> Result<()> {
    if !state.users.is_registered(backend, username)? {
        return Err(ServiceError::NotFound(format!("user {}", username)));
    }
    Ok(())
}

fn followed_set(state: &mut ServiceState, backend: &Backend, username: &str) -> Result<HashSet<String>> {
    Ok(state
        .follows
        .followees(backend, username)?
        .iter()
        .cloned()
        .collect())
}

/// Result of a historical monitor call. `cursor` is the creation time of the
/// newest replayed chirp, or the requested timestamp when nothing matched,
/// and can be passed straight back into the next call.
#[derive(Debug, Clone)]
pub struct MonitorReplay {
    pub chirps: Vec<Chirp>,
    pub cursor: DateTime<Utc>,
}

/// A live monitor. Dropping it closes the monitor.
pub struct Subscription {
    id: SubscriptionId,
    session: Session,
    rx: mpsc::UnboundedReceiver<Chirp>,
    inner: Arc<ServiceInner>,
}

impl Subscription {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Wait for the next delivered chirp.
    pub async fn recv(&mut self) -> Option<Chirp> {
        self.rx.recv().await
    }

    /// Blocking variant of [`Subscription::recv`]. Must not be called from
    /// inside an async runtime.
    pub fn blocking_recv(&mut self) -> Option<Chirp> {
        self.rx.blocking_recv()
    }

    /// The next chirp if one is already queued.
    pub fn try_recv(&mut self) -> Option<Chirp> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Closing first lets the hub prune this entry if the lock is busy now.
        self.rx.close();
        if let Ok(mut state) = self.inner.state.try_lock() {
            state.monitor.unsubscribe(self.id);
        }
    }
}
