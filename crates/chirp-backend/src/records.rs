//! Stored record types. These map directly to storage values and are
//! distinct from chirp-types API models to keep the storage layout independent.

use chirp_types::models::{Chirp, ChirpId, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::keys;
use crate::store::StorageError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A removed chirp stays in storage as a tombstone (`removed`, empty text) so
/// replies below it keep their place in the thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChirpRecord {
    pub id: ChirpId,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub parent_id: ChirpId,
    #[serde(default)]
    pub removed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowRecord {
    pub follower: String,
    pub followees: Vec<String>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            username: record.username,
            created_at: record.created_at,
        }
    }
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            created_at: user.created_at,
        }
    }
}

impl ChirpRecord {
    pub fn live(chirp: &Chirp) -> Self {
        Self {
            id: chirp.id,
            username: chirp.username.clone(),
            text: chirp.text.clone(),
            created_at: chirp.created_at,
            parent_id: chirp.parent_id,
            removed: false,
        }
    }

    pub fn tombstone(chirp: &Chirp) -> Self {
        Self {
            text: String::new(),
            removed: true,
            ..Self::live(chirp)
        }
    }

    pub fn into_chirp(self) -> Chirp {
        Chirp {
            id: self.id,
            username: self.username,
            text: self.text,
            created_at: self.created_at,
            parent_id: self.parent_id,
        }
    }
}

pub(crate) fn encode<T: Serialize>(key: &[u8], record: &T) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(record).map_err(|e| StorageError::Corrupt {
        key: keys::display(key),
        reason: e.to_string(),
    })
}

pub(crate) fn decode<T: DeserializeOwned>(key: &[u8], bytes: &[u8]) -> Result<T, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Corrupt {
        key: keys::display(key),
        reason: e.to_string(),
    })
}
