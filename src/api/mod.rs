//! HTTP request layer over the machine state and processed metrics

mod handlers;

use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use crate::core::RuntimeStats;
use crate::machine::MachineState;
use crate::store::ReadingStore;
use crate::streaming::MetricsSource;

/// Shared handles the handlers read from
#[derive(Clone)]
pub struct AppState {
    pub machine: Arc<MachineState>,
    pub store: Arc<dyn ReadingStore>,
    /// Latest processed snapshot, from this process or the shared metrics table
    pub metrics: Arc<dyn MetricsSource>,
    pub stats: Arc<RuntimeStats>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(handlers::get_status).post(handlers::update_status))
        .route("/data", get(handlers::get_data))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .with_state(state)
}

/// Serve the API on `addr` until the shutdown signal fires
pub async fn serve(addr: SocketAddr, state: AppState, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("API listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            info!("API server shutting down");
        })
        .await?;

    Ok(())
}
