pub mod chirps;
pub mod error;
pub mod follows;
pub mod monitor;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use chirp_service::ChirpService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub service: ChirpService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", post(users::register))
        .route("/users/{username}/following", get(users::following))
        .route("/users/{username}/chirps", get(users::user_chirps))
        .route("/chirps", post(chirps::post_chirp))
        .route(
            "/chirps/{id}",
            get(chirps::read_chirp)
                .put(chirps::edit_chirp)
                .delete(chirps::delete_chirp),
        )
        .route("/follows", post(follows::follow))
        .route("/monitor/{username}", get(monitor::monitor))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
