use std::collections::HashMap;

use chirp_backend::Backend;
use chirp_backend::records::ChirpRecord;
use chirp_types::models::{Chirp, ChirpId, ROOT_PARENT};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{Result, ServiceError};

struct ChirpNode {
    chirp: Chirp,
    removed: bool,
}

/// The chirp forest.
///
/// Every chirp ever posted keeps a node, removed ones as tombstones, so the
/// parent -> children index stays intact below a deleted chirp. Children are
/// appended as they are posted, and ids only grow, so each child list is
/// already in ascending id order.
#[derive(Default)]
pub struct ChirpStore {
    nodes: HashMap<ChirpId, ChirpNode>,
    children: HashMap<ChirpId, Vec<ChirpId>>,
    by_author: HashMap<String, Vec<ChirpId>>,
    last_id: ChirpId,
    last_created_at: Option<DateTime<Utc>>,
}

impl ChirpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored records, which must arrive in ascending id order.
    pub fn restore(records: Vec<ChirpRecord>, counter: ChirpId) -> Self {
        let mut store = Self::new();
        for record in records {
            let removed = record.removed;
            store.attach(record.into_chirp(), removed);
        }
        store.last_id = store.last_id.max(counter);
        store
    }

    pub fn last_id(&self) -> ChirpId {
        self.last_id
    }

    /// The live chirp at `id`.
    pub fn get(&self, id: ChirpId) -> Option<&Chirp> {
        self.nodes
            .get(&id)
            .filter(|node| !node.removed)
            .map(|node| &node.chirp)
    }

    /// Ids of an author's live chirps, ascending.
    pub fn authored_by(&self, username: &str) -> Vec<ChirpId> {
        self.by_author.get(username).cloned().unwrap_or_default()
    }

    /// Assign the next id and commit the chirp. The caller has already
    /// checked that `author` is registered.
    pub fn post(
        &mut self,
        backend: &Backend,
        author: &str,
        text: &str,
        parent_id: ChirpId,
        now: DateTime<Utc>,
    ) -> Result<Chirp> {
        if text.is_empty() {
            return Err(ServiceError::InvalidArgument("chirp text is empty".into()));
        }
        // Tombstoned parents still count: they existed when the reply is made.
        if parent_id != ROOT_PARENT && !self.nodes.contains_key(&parent_id) {
            return Err(ServiceError::NotFound(format!("parent chirp {}", parent_id)));
        }

        // Keep timestamps monotonic with ids even if the wall clock steps back.
        let created_at = match self.last_created_at {
            Some(last) if last > now => last,
            _ => now,
        };
        let chirp = Chirp {
            id: self.last_id + 1,
            username: author.to_string(),
            text: text.to_string(),
            created_at,
            parent_id,
        };

        backend.insert_chirp(&ChirpRecord::live(&chirp))?;
        self.attach(chirp.clone(), false);

        debug!("{} posted chirp {} (parent {})", author, chirp.id, parent_id);
        Ok(chirp)
    }

    pub fn edit(&mut self, backend: &Backend, id: ChirpId, text: &str) -> Result<Chirp> {
        if text.is_empty() {
            return Err(ServiceError::InvalidArgument("chirp text is empty".into()));
        }
        let mut updated = self.live(id)?.clone();
        updated.text = text.to_string();

        backend.update_chirp(&ChirpRecord::live(&updated))?;
        if let Some(node) = self.nodes.get_mut(&id) {
            node.chirp.text = updated.text.clone();
        }

        debug!("Edited chirp {}", id);
        Ok(updated)
    }

    pub fn delete(&mut self, backend: &Backend, id: ChirpId) -> Result<()> {
        let chirp = self.live(id)?;
        backend.update_chirp(&ChirpRecord::tombstone(chirp))?;

        if let Some(node) = self.nodes.get_mut(&id) {
            node.removed = true;
            node.chirp.text.clear();
            if let Some(ids) = self.by_author.get_mut(&node.chirp.username) {
                ids.retain(|&other| other != id);
            }
        }

        debug!("Deleted chirp {}", id);
        Ok(())
    }

    /// The chirp at `id` followed by its live descendants in depth-first
    /// pre-order, siblings in ascending id order. Removed chirps are skipped
    /// but their descendants are not.
    pub fn read(&self, id: ChirpId) -> Result<Vec<Chirp>> {
        self.live(id)?;

        let mut thread = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                if !node.removed {
                    thread.push(node.chirp.clone());
                }
            }
            if let Some(kids) = self.children.get(&current) {
                stack.extend(kids.iter().rev());
            }
        }
        Ok(thread)
    }

    fn live(&self, id: ChirpId) -> Result<&Chirp> {
        self.get(id)
            .ok_or_else(|| ServiceError::NotFound(format!("chirp {}", id)))
    }

    fn attach(&mut self, chirp: Chirp, removed: bool) {
        let id = chirp.id;
        self.children.entry(chirp.parent_id).or_default().push(id);
        if !removed {
            self.by_author
                .entry(chirp.username.clone())
                .or_default()
                .push(id);
        }
        self.last_id = self.last_id.max(id);
        self.last_created_at = Some(match self.last_created_at {
            Some(last) if last > chirp.created_at => last,
            _ => chirp.created_at,
        });
        self.nodes.insert(id, ChirpNode { chirp, removed });
    }
}
