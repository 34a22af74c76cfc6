use serde::{Deserialize, Serialize};

use crate::models::{ChirpId, ROOT_PARENT};

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub username: String,
}

// -- Chirps --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostChirpRequest {
    pub username: String,
    pub text: String,
    #[serde(default = "root_parent")]
    pub parent_id: ChirpId,
}

fn root_parent() -> ChirpId {
    ROOT_PARENT
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditChirpRequest {
    pub username: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteChirpQuery {
    pub username: String,
}

// -- Follows --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FollowRequest {
    pub username: String,
    pub to_follow: String,
}

// -- Errors --

/// Body of every non-2xx response from the service tier.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
