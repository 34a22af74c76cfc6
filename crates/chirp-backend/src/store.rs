use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("key not found")]
    NotFound,

    #[error("storage connection failed: {0}")]
    Connection(String),

    #[error("storage protocol error: {0}")]
    Protocol(String),

    #[error("storage rejected request: {0}")]
    Rejected(String),

    #[error("corrupt record at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl StorageError {
    /// Errors after which a connection can no longer be trusted to be in sync.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Protocol(_))
    }
}

/// The storage tier: an opaque-bytes key-value service.
///
/// Calls are synchronous and may block on network I/O. Implementations must be
/// safe to share between threads.
pub trait KeyValueStore: Send + Sync {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// One entry per requested key, in request order; `None` for absent keys.
    fn get(&self, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>, StorageError>;

    /// Fails with [`StorageError::NotFound`] if the key is absent.
    fn delete(&self, key: &[u8]) -> Result<(), StorageError>;
}
