use std::collections::{BTreeSet, HashMap};

use chirp_backend::Backend;
use chirp_backend::records::FollowRecord;
use tracing::info;

use crate::error::{Result, ServiceError};

/// Directed follower -> followee edges. A follower's whole edge set is loaded
/// from storage the first time it is needed.
///
/// Callers check that both usernames are registered; the graph only enforces
/// set semantics.
#[derive(Default)]
pub struct FollowGraph {
    edges: HashMap<String, BTreeSet<String>>,
}

impl FollowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn followees(&mut self, backend: &Backend, follower: &str) -> Result<&BTreeSet<String>> {
        if !self.edges.contains_key(follower) {
            let loaded = backend
                .get_follows(follower)?
                .map(|record| record.followees.into_iter().collect())
                .unwrap_or_default();
            self.edges.insert(follower.to_string(), loaded);
        }
        self.edges
            .get(follower)
            .ok_or_else(|| ServiceError::Internal(format!("follow set for {} not loaded", follower)))
    }

    pub fn follow(&mut self, backend: &Backend, follower: &str, followee: &str) -> Result<()> {
        if follower == followee {
            return Err(ServiceError::InvalidArgument(format!(
                "{} cannot follow themselves",
                follower
            )));
        }

        let current = self.followees(backend, follower)?;
        if current.contains(followee) {
            return Err(ServiceError::AlreadyExists(format!(
                "{} already follows {}",
                follower, followee
            )));
        }

        let mut updated = current.clone();
        updated.insert(followee.to_string());
        backend.put_follows(&FollowRecord {
            follower: follower.to_string(),
            followees: updated.iter().cloned().collect(),
        })?;
        self.edges.insert(follower.to_string(), updated);

        info!("{} now follows {}", follower, followee);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chirp_backend::MemoryStore;

    use super::*;

    #[test]
    fn edges_form_a_set() {
        let backend = Backend::new(Arc::new(MemoryStore::new()));
        let mut graph = FollowGraph::new();

        graph.follow(&backend, "alice", "bob").unwrap();
        graph.follow(&backend, "alice", "carol").unwrap();
        assert!(matches!(
            graph.follow(&backend, "alice", "bob"),
            Err(ServiceError::AlreadyExists(_))
        ));

        let followees: Vec<&String> = graph.followees(&backend, "alice").unwrap().iter().collect();
        assert_eq!(followees, vec!["bob", "carol"]);
        assert!(graph.followees(&backend, "bob").unwrap().is_empty());
    }

    #[test]
    fn edges_survive_a_reload() {
        let backend = Backend::new(Arc::new(MemoryStore::new()));
        FollowGraph::new().follow(&backend, "alice", "bob").unwrap();

        let mut reloaded = FollowGraph::new();
        assert!(reloaded.followees(&backend, "alice").unwrap().contains("bob"));
        assert!(matches!(
            reloaded.follow(&backend, "alice", "bob"),
            Err(ServiceError::AlreadyExists(_))
        ));
    }

    #[test]
    fn failed_write_leaves_graph_unchanged() {
        let store = Arc::new(MemoryStore::new());
        let backend = Backend::new(store.clone());
        let mut graph = FollowGraph::new();

        store.fail_writes_with_prefix("follow:");
        assert!(matches!(
            graph.follow(&backend, "alice", "bob"),
            Err(ServiceError::Internal(_))
        ));
        store.clear_failures();

        assert!(graph.followees(&backend, "alice").unwrap().is_empty());
        graph.follow(&backend, "alice", "bob").unwrap();
    }

    #[test]
    fn self_follow_is_rejected() {
        let backend = Backend::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            FollowGraph::new().follow(&backend, "alice", "alice"),
            Err(ServiceError::InvalidArgument(_))
        ));
    }
}
