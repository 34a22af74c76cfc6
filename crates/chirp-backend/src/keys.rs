//! Storage key layout. Keys are UTF-8 so they stay readable in the store.

use chirp_types::models::ChirpId;

pub const USER_PREFIX: &str = "user:";
pub const CHIRP_PREFIX: &str = "chirp:";
pub const FOLLOW_PREFIX: &str = "follow:";

/// Holds the last chirp id handed out, as decimal ASCII.
pub const CHIRP_COUNTER_KEY: &[u8] = b"meta:chirp_counter";

pub fn user_key(username: &str) -> Vec<u8> {
    format!("{USER_PREFIX}{username}").into_bytes()
}

pub fn chirp_key(id: ChirpId) -> Vec<u8> {
    format!("{CHIRP_PREFIX}{id}").into_bytes()
}

/// One key per follower; the value lists every followee.
pub fn follow_key(follower: &str) -> Vec<u8> {
    format!("{FOLLOW_PREFIX}{follower}").into_bytes()
}

pub fn display(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed_and_distinct() {
        assert_eq!(user_key("alice"), b"user:alice".to_vec());
        assert_eq!(chirp_key(42), b"chirp:42".to_vec());
        assert_eq!(follow_key("alice"), b"follow:alice".to_vec());
        assert_ne!(user_key("42"), chirp_key(42));
    }
}
