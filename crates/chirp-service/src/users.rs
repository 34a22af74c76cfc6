use std::collections::HashMap;

use chirp_backend::Backend;
use chirp_backend::records::UserRecord;
use chirp_types::models::User;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{Result, ServiceError};

/// Registered users. Loaded from storage on first lookup and cached; users
/// are never deleted so the cache never goes stale.
#[derive(Default)]
pub struct UserDirectory {
    users: HashMap<String, User>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&mut self, backend: &Backend, username: &str) -> Result<Option<&User>> {
        if !self.users.contains_key(username) {
            match backend.get_user(username)? {
                Some(record) => {
                    self.users.insert(username.to_string(), record.into());
                }
                None => return Ok(None),
            }
        }
        Ok(self.users.get(username))
    }

    pub fn is_registered(&mut self, backend: &Backend, username: &str) -> Result<bool> {
        Ok(self.lookup(backend, username)?.is_some())
    }

    pub fn register(&mut self, backend: &Backend, username: &str, now: DateTime<Utc>) -> Result<User> {
        if username.is_empty() {
            return Err(ServiceError::InvalidArgument("username is empty".into()));
        }
        if self.is_registered(backend, username)? {
            return Err(ServiceError::AlreadyExists(format!("user {}", username)));
        }

        let user = User {
            username: username.to_string(),
            created_at: now,
        };
        backend.put_user(&UserRecord::from(&user))?;
        self.users.insert(user.username.clone(), user.clone());

        info!("Registered user {}", username);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chirp_backend::MemoryStore;

    use super::*;

    #[test]
    fn registration_is_persisted_and_unique() {
        let backend = Backend::new(Arc::new(MemoryStore::new()));
        let mut users = UserDirectory::new();

        users.register(&backend, "alice", Utc::now()).unwrap();
        assert!(matches!(
            users.register(&backend, "alice", Utc::now()),
            Err(ServiceError::AlreadyExists(_))
        ));

        // A fresh directory finds the user through storage.
        let mut reloaded = UserDirectory::new();
        assert!(reloaded.is_registered(&backend, "alice").unwrap());
        assert!(!reloaded.is_registered(&backend, "bob").unwrap());
    }

    #[test]
    fn empty_username_is_rejected_without_writing() {
        let store = Arc::new(MemoryStore::new());
        let backend = Backend::new(store.clone());
        let mut users = UserDirectory::new();

        assert!(matches!(
            users.register(&backend, "", Utc::now()),
            Err(ServiceError::InvalidArgument(_))
        ));
        assert!(store.is_empty());
    }
}
