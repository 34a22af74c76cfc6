use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use chirp_types::api::FollowRequest;

use crate::AppState;
use crate::error::{ApiError, blocking};

/// POST /follows
pub async fn follow(
    State(state): State<AppState>,
    payload: Result<Json<FollowRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    blocking(&state, move |service| service.follow(&req.username, &req.to_follow)).await?;
    Ok(StatusCode::NO_CONTENT)
}
