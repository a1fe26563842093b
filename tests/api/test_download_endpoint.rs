// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Endpoint tests for GET /download/:filename

use super::common::*;
use axum::http::{header, StatusCode};
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_missing_file_returns_404() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);

    let response = send(&state, get_request("/download/does-not-exist.jpg")).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json(), serde_json::json!({"error": "File not found"}));
}

#[tokio::test]
async fn test_path_traversal_returns_404() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);
    std::fs::write(tmp.path().join("secret.jpg"), b"secret").unwrap();

    let response = send(&state, get_request("/download/..%2Fsecret.jpg")).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(tmp.path().join("secret.jpg").exists());
}

#[tokio::test]
async fn test_file_is_deleted_after_download() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);
    let (_, path) = upload(&state, "keras").await;

    let first = send(&state, get_request(&path)).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.headers[header::CONTENT_TYPE], "image/jpeg");

    // Delay in the test config is 100ms
    tokio::time::sleep(Duration::from_millis(500)).await;

    let second = send(&state, get_request(&path)).await;
    assert_eq!(second.status, StatusCode::NOT_FOUND);
    assert_eq!(second.json()["error"], "File not found");
}

#[tokio::test]
async fn test_repeat_download_within_delay_is_served() {
    let tmp = TempDir::new().unwrap();
    let config = ocr_image_api::config::ServiceConfig {
        download_delete_delay_ms: 5_000,
        ..test_config(&tmp)
    };
    let state = test_state_with(fake_engines(), config);
    let (_, path) = upload(&state, "easyocr").await;

    let first = send(&state, get_request(&path)).await;
    let second = send(&state, get_request(&path)).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(first.body, second.body);
    assert_eq!(state.store.pending_deletions(), 2);

    // Shutdown deletes right away; the duplicate deletion is harmless
    state.store.shutdown().await;
    let after = send(&state, get_request(&path)).await;
    assert_eq!(after.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_undownloaded_file_persists() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);
    let (_, path) = upload(&state, "keras").await;

    tokio::time::sleep(Duration::from_millis(300)).await;

    let filename = path.trim_start_matches("/download/");
    assert!(state.store.dir().join(filename).exists());
}
