use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use chirp_types::api::{RegisterRequest, RegisterResponse};

use crate::AppState;
use crate::error::{ApiError, blocking};

/// POST /users
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let user = blocking(&state, move |service| service.register_user(&req.username)).await?;
    info!("Registered {} over HTTP", user.username);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            username: user.username,
        }),
    ))
}

/// GET /users/{username}/following
pub async fn following(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let followees = blocking(&state, move |service| service.following(&username)).await?;
    Ok(Json(followees))
}

/// GET /users/{username}/chirps
pub async fn user_chirps(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = blocking(&state, move |service| service.user_chirps(&username)).await?;
    Ok(Json(ids))
}
