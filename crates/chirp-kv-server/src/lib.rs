pub mod routes;
pub mod storage;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::routes::AppState;
use crate::storage::KvStore;

pub fn router(store: Arc<KvStore>) -> Router {
    Router::new()
        .route("/kv", get(routes::kv_ws))
        .route("/health", get(routes::health))
        .with_state(AppState { store })
}
