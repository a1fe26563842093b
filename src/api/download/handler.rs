// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Annotated image download handler

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// GET /download/:filename - Serve a stored JPEG, then delete it shortly after
///
/// # Errors
/// - 404 Not Found: `{"error": "File not found"}` when the file does not exist
pub async fn download_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let (path, bytes) = state.store.read(&filename).await.map_err(|e| {
        debug!("Download of {:?} failed: {}", filename, e);
        ApiError::from(e)
    })?;

    state.store.schedule_deletion(path);
    info!("📤 Served {} ({} bytes)", filename, bytes.len());

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}
