// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::download::download_handler;
use super::process_image::process_image_handler;
use crate::config::ServiceConfig;
use crate::storage::OutputStore;
use crate::vision::{Annotator, EngineInfo, OcrEngines};

/// Shared, read-only services handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub engines: Arc<OcrEngines>,
    pub annotator: Arc<Annotator>,
    pub store: Arc<OutputStore>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(
        engines: OcrEngines,
        annotator: Annotator,
        store: OutputStore,
        config: ServiceConfig,
    ) -> Self {
        Self {
            engines: Arc::new(engines),
            annotator: Arc::new(annotator),
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub engines: Vec<EngineInfo>,
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        // OCR + annotation
        .route("/procesar-imagen", post(process_image_handler))
        // One-shot download of annotated output
        .route("/download/:filename", get(download_handler))
        // Health check
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves, then flush pending output deletions
pub async fn start_server<F>(state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = state.config.listen_addr()?;
    let store = state.store.clone();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("API server stopped; flushing pending deletions");
    store.shutdown().await;

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        engines: state.engines.list_engines(),
    })
}
