use std::hash::{Hash, Hasher};

use uuid::Uuid;

/// A login. Many sessions may exist per user; two sessions are equal only
/// when they come from the same `login` call.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    username: String,
}

impl Session {
    pub(crate) fn new(username: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Session {}

impl Hash for Session {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
