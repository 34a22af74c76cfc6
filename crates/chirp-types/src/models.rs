use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chirp ids start at 1; 0 is reserved for "no parent".
pub type ChirpId = u64;

pub const ROOT_PARENT: ChirpId = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A single post as seen by callers. Replies point at their parent through
/// `parent_id`; top-level chirps carry `ROOT_PARENT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chirp {
    pub id: ChirpId,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub parent_id: ChirpId,
}

impl Chirp {
    pub fn is_reply(&self) -> bool {
        self.parent_id != ROOT_PARENT
    }
}
