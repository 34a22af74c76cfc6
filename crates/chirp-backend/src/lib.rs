pub mod keys;
pub mod memory;
pub mod queries;
pub mod records;
pub mod remote;
pub mod store;

use std::sync::Arc;

pub use memory::MemoryStore;
pub use remote::RemoteStore;
pub use store::{KeyValueStore, StorageError};

/// Typed access to the storage tier. The only component that talks to a
/// [`KeyValueStore`]; everything above it works with records.
#[derive(Clone)]
pub struct Backend {
    store: Arc<dyn KeyValueStore>,
}

impl Backend {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }
}
