// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image processing endpoint handler

use std::time::Instant;

use axum::{extract::State, http::HeaderMap, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use tracing::{debug, info, warn};

use super::request::{resolve_method, ProcessImageForm};
use super::response::{base_url, ProcessImageResponse};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::{decode_image_bytes, encode_jpeg};

/// POST /procesar-imagen - Extract text and store an annotated copy
///
/// # Request (multipart/form-data)
/// - `image`: image file (required)
/// - `ocr_method`: `"keras"` or `"easyocr"` (required)
///
/// # Response
/// - `text`: recognized strings joined by single spaces
/// - `image_url`: absolute URL of the annotated JPEG
///
/// # Errors
/// - 400 Bad Request: missing field, undecodable image, or (strict mode) unknown method
/// - 503 Service Unavailable: selected engine not loaded
/// - 500 Internal Server Error: OCR or storage failure
pub async fn process_image_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessImageResponse>, ApiError> {
    let start = Instant::now();

    // 1. Parse and validate the form
    let multipart = multipart.map_err(|e| {
        warn!("Rejected multipart request: {}", e);
        ApiError::InvalidRequest(e.body_text())
    })?;
    let form = ProcessImageForm::from_multipart(multipart).await?.validate()?;
    let method = resolve_method(&form.ocr_method, state.config.strict_ocr_method)?;
    debug!(
        "Processing {} byte upload with method {:?}",
        form.image.len(),
        form.ocr_method
    );

    // 2. Decode, recognize, annotate and encode on the blocking pool
    let engines = state.engines.clone();
    let annotator = state.annotator.clone();
    let quality = state.config.jpeg_quality;
    let (text, jpeg) = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let (image, info) = decode_image_bytes(&form.image)?;
        debug!("Decoded image: {}x{} {:?}", info.width, info.height, info.format);

        let result = engines.recognize(method, &image)?;
        let annotated = annotator.render(&image, &result);
        let jpeg = encode_jpeg(&annotated, quality)
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        Ok((result.text(), jpeg))
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("Processing task failed: {}", e)))??;

    // 3. Store the output and build its URL
    let filename = state.store.save(&jpeg).await?;
    let response = ProcessImageResponse::new(text, &base_url(&state.config, &headers), &filename);

    info!(
        "Processed image with {}: {} chars, {} ({}ms)",
        form.ocr_method,
        response.text.len(),
        filename,
        start.elapsed().as_millis()
    );

    Ok(Json(response))
}
