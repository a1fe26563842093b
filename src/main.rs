// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use ocr_image_api::{
    api::{start_server, AppState},
    config::ServiceConfig,
    storage::{spawn_sweeper, OutputStore},
    version,
    vision::{Annotator, OcrEngines},
};
use std::env;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present, before reading any configuration
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    tracing::info!("🚀 Starting {}", version::get_version_string());

    let config = ServiceConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    // Output directory
    let store = OutputStore::new(&config.output_dir, config.delete_delay())
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    // OCR engines
    tracing::info!("🧠 Loading OCR engines...");
    let engines = OcrEngines::load(config.models.clone()).await?;
    for engine in engines.list_engines() {
        if !engine.available {
            tracing::warn!("⚠️ OCR engine '{}' unavailable; requests for it get 503", engine.name);
        }
    }

    // Annotation font
    let annotator = Annotator::load(config.annotation_font_path.as_deref())?;
    match config.annotation_font_path {
        Some(ref path) => tracing::info!("✅ Annotation font loaded from {}", path.display()),
        None => tracing::info!("✅ Using bundled annotation font"),
    }

    // Sweeper for outputs that are never downloaded
    let sweeper = spawn_sweeper(
        store.dir().to_path_buf(),
        config.output_ttl(),
        config.sweep_interval(),
        store.cancel_token(),
    );

    let state = AppState::new(engines, annotator, store, config);
    start_server(state, shutdown_signal()).await?;

    // The store's shutdown cancelled the sweeper
    if let Err(e) = sweeper.await {
        tracing::warn!("Sweeper task ended abnormally: {}", e);
    }

    tracing::info!("👋 Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, shutting down..."),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
