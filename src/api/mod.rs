//! HTTP layer exposing analyses of a loaded snapshot.

pub mod routes;
pub mod types;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{config::Settings, data::RecordStore};

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub store: Arc<RecordStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/quality", get(routes::quality))
        .route("/anomalies", get(routes::anomalies))
        .route("/outcomes", get(routes::outcomes))
        .route("/signals", get(routes::list_signals))
        .route("/drugs/top", get(routes::top_drugs))
        .route("/risk", get(routes::risk))
        .route("/analysis/:analysis", get(routes::run_analysis))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(settings: Settings, store: RecordStore, host: String, port: u16) -> Result<()> {
    let state = AppState {
        settings,
        store: Arc::new(store),
    };
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!(%addr, cases = state.store.cases.len(), "serving faers-surveillance API");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
