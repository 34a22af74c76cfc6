mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use chirp_api::{AppState, AppStateInner};
use chirp_backend::{KeyValueStore, MemoryStore, RemoteStore};
use chirp_service::ChirpService;

use crate::config::{Config, StorageTarget};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chirp_server=info,chirp_api=info,chirp_service=info,chirp_backend=info,tower_http=info".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Connecting and replaying storage both block.
    let storage = config.storage.clone();
    let service = tokio::task::spawn_blocking(move || -> anyhow::Result<ChirpService> {
        let store: Arc<dyn KeyValueStore> = match storage {
            StorageTarget::Memory => {
                info!("Using in-memory storage");
                Arc::new(MemoryStore::new())
            }
            StorageTarget::Remote(url) => {
                info!("Connecting to storage tier at {}", url);
                Arc::new(RemoteStore::connect(&url)?)
            }
        };
        Ok(ChirpService::open(store)?)
    })
    .await??;

    let state: AppState = Arc::new(AppStateInner { service });
    let app = chirp_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Chirp server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(_) => {
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
