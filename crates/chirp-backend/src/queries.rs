use std::ops::RangeInclusive;

use chirp_types::models::ChirpId;
use tracing::{debug, warn};

use crate::Backend;
use crate::keys::{self, CHIRP_COUNTER_KEY};
use crate::records::{self, ChirpRecord, FollowRecord, UserRecord};
use crate::store::StorageError;

impl Backend {
    // -- Users --

    pub fn get_user(&self, username: &str) -> Result<Option<UserRecord>, StorageError> {
        self.get_record(&keys::user_key(username))
    }

    pub fn put_user(&self, user: &UserRecord) -> Result<(), StorageError> {
        self.put_record(&keys::user_key(&user.username), user)
    }

    // -- Follows --

    pub fn get_follows(&self, follower: &str) -> Result<Option<FollowRecord>, StorageError> {
        self.get_record(&keys::follow_key(follower))
    }

    pub fn put_follows(&self, follows: &FollowRecord) -> Result<(), StorageError> {
        self.put_record(&keys::follow_key(&follows.follower), follows)
    }

    // -- Chirps --

    /// Last chirp id handed out, 0 if none.
    pub fn get_chirp_counter(&self) -> Result<ChirpId, StorageError> {
        let values = self.store().get(&[CHIRP_COUNTER_KEY.to_vec()])?;
        match values.into_iter().next().flatten() {
            None => Ok(0),
            Some(bytes) => std::str::from_utf8(&bytes)
                .ok()
                .and_then(|s| s.parse::<ChirpId>().ok())
                .ok_or_else(|| StorageError::Corrupt {
                    key: keys::display(CHIRP_COUNTER_KEY),
                    reason: "counter is not a decimal integer".into(),
                }),
        }
    }

    /// Fetch every stored chirp in `ids` with a single batched get. Ids with
    /// no record are skipped.
    pub fn get_chirps(&self, ids: RangeInclusive<ChirpId>) -> Result<Vec<ChirpRecord>, StorageError> {
        let keys: Vec<Vec<u8>> = ids.map(keys::chirp_key).collect();
        let values = self.store().get(&keys)?;
        if values.len() != keys.len() {
            return Err(StorageError::Protocol(format!(
                "asked for {} chirps, got {} replies",
                keys.len(),
                values.len()
            )));
        }

        let mut chirps = Vec::with_capacity(keys.len());
        for (key, value) in keys.iter().zip(values) {
            match value {
                Some(bytes) => chirps.push(records::decode(key, &bytes)?),
                None => debug!("No record at {}, skipping", keys::display(key)),
            }
        }
        Ok(chirps)
    }

    /// Commit a freshly posted chirp: its record, then the counter. If the
    /// counter cannot be written the record is removed again so a failed post
    /// leaves nothing behind.
    pub fn insert_chirp(&self, chirp: &ChirpRecord) -> Result<(), StorageError> {
        let key = keys::chirp_key(chirp.id);
        self.put_record(&key, chirp)?;

        if let Err(e) = self
            .store()
            .put(CHIRP_COUNTER_KEY, chirp.id.to_string().as_bytes())
        {
            if let Err(rollback) = self.store().delete(&key) {
                warn!(
                    "Failed to roll back {} after counter write failed: {}",
                    keys::display(&key),
                    rollback
                );
            }
            return Err(e);
        }
        Ok(())
    }

    /// Overwrite an existing chirp record (edits and tombstones).
    pub fn update_chirp(&self, chirp: &ChirpRecord) -> Result<(), StorageError> {
        self.put_record(&keys::chirp_key(chirp.id), chirp)
    }

    // -- Helpers --

    fn get_record<T: serde::de::DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, StorageError> {
        let values = self.store().get(&[key.to_vec()])?;
        match values.into_iter().next().flatten() {
            Some(bytes) => records::decode(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    fn put_record<T: serde::Serialize>(&self, key: &[u8], record: &T) -> Result<(), StorageError> {
        let bytes = records::encode(key, record)?;
        self.store().put(key, &bytes)
    }
}
