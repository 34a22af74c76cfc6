use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use chirp_types::api::{DeleteChirpQuery, EditChirpRequest, PostChirpRequest};
use chirp_types::models::ChirpId;

use crate::AppState;
use crate::error::{ApiError, blocking};

/// POST /chirps
pub async fn post_chirp(
    State(state): State<AppState>,
    payload: Result<Json<PostChirpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let chirp = blocking(&state, move |service| {
        service.chirp(&req.username, &req.text, req.parent_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(chirp)))
}

/// PUT /chirps/{id}
pub async fn edit_chirp(
    State(state): State<AppState>,
    Path(id): Path<ChirpId>,
    payload: Result<Json<EditChirpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let chirp = blocking(&state, move |service| {
        service.edit_chirp(&req.username, id, &req.text)
    })
    .await?;
    Ok(Json(chirp))
}

/// DELETE /chirps/{id}?username=
pub async fn delete_chirp(
    State(state): State<AppState>,
    Path(id): Path<ChirpId>,
    Query(query): Query<DeleteChirpQuery>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |service| service.delete_chirp(&query.username, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /chirps/{id} -- the chirp and its thread below it, in pre-order.
pub async fn read_chirp(
    State(state): State<AppState>,
    Path(id): Path<ChirpId>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = blocking(&state, move |service| service.read(id)).await?;
    Ok(Json(thread))
}
