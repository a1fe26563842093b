// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Endpoint tests for POST /procesar-imagen
//!
//! Engines are replaced with fakes so the full request path (multipart
//! parsing, dispatch, annotation, JPEG encoding, storage) runs without models.

use super::common::*;
use axum::http::{header, StatusCode};
use ocr_image_api::vision::{decode_image_bytes, ocr::Quad, OcrEngines, OcrMethod};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_missing_image_returns_400() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);

    let response = send(&state, upload_request(&[Part::Text("ocr_method", "keras")])).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let json = response.json();
    assert!(json["error"].as_str().unwrap().contains("image"));
}

#[tokio::test]
async fn test_missing_method_returns_400() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);
    let png = png_bytes(8, 8);

    let response = send(&state, upload_request(&[Part::File("image", &png)])).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"]
        .as_str()
        .unwrap()
        .contains("ocr_method"));
}

#[tokio::test]
async fn test_empty_form_returns_400() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);

    let response = send(&state, upload_request(&[])).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json().get("error").is_some());
}

#[tokio::test]
async fn test_non_multipart_request_returns_400() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/procesar-imagen")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(r#"{"ocr_method":"keras"}"#))
        .unwrap();
    let response = send(&state, request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json().get("error").is_some());
}

#[tokio::test]
async fn test_keras_returns_text_and_fetchable_image() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);

    let (text, path) = upload(&state, "keras").await;
    assert_eq!(text, "hello");
    assert!(path.starts_with("/download/"));
    assert!(path.ends_with(".jpg"));

    let response = send(&state, get_request(&path)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "image/jpeg");

    let (image, _) = decode_image_bytes(&response.body).unwrap();
    assert_eq!((image.width(), image.height()), (64, 32));
}

#[tokio::test]
async fn test_easyocr_joins_text_with_spaces() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);

    let (text, path) = upload(&state, "easyocr").await;
    assert_eq!(text, "hello world");

    let response = send(&state, get_request(&path)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..3], &[0xFF, 0xD8, 0xFF]);
}

#[tokio::test]
async fn test_annotation_is_drawn() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);

    let (_, path) = upload(&state, "easyocr").await;
    let response = send(&state, get_request(&path)).await;
    let (image, _) = decode_image_bytes(&response.body).unwrap();
    let rgb = image.to_rgb8();

    // Box outlines darken the red channel of the white input
    assert!(rgb.pixels().any(|p| p[0] < 200));
}

#[tokio::test]
async fn test_default_config_draws_text_label() {
    let tmp = TempDir::new().unwrap();
    let engine = PlacedEngine {
        method: OcrMethod::EasyOcr,
        text: "HELLO",
        quad: Quad::from_rect(20.0, 70.0, 180.0, 110.0),
    };
    let engines = OcrEngines::new(None, Some(Arc::new(engine)));
    let state = test_state_with(engines, test_config(&tmp));

    let (text, path) = upload_image(&state, "easyocr", &png_bytes(200, 120)).await;
    assert_eq!(text, "HELLO");

    let response = send(&state, get_request(&path)).await;
    let (image, _) = decode_image_bytes(&response.body).unwrap();
    let rgb = image.to_rgb8();

    // Label sits in the band above the box, clear of the outline at y=70
    let label_pixels = (30..62)
        .flat_map(|y| (20..120).map(move |x| (x, y)))
        .filter(|&(x, y)| rgb.get_pixel(x, y)[0] < 160)
        .count();
    assert!(label_pixels > 0, "no text drawn above the region");
}

#[tokio::test]
async fn test_unknown_method_returns_empty_text() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);

    let (text, path) = upload(&state, "tesseract").await;
    assert_eq!(text, "");

    let response = send(&state, get_request(&path)).await;
    assert_eq!(response.status, StatusCode::OK);

    // Nothing drawn: the image stays white
    let (image, _) = decode_image_bytes(&response.body).unwrap();
    let rgb = image.to_rgb8();
    assert!(rgb.pixels().all(|p| p.0.iter().all(|c| *c > 240)));
}

#[tokio::test]
async fn test_unknown_method_rejected_in_strict_mode() {
    let tmp = TempDir::new().unwrap();
    let config = ocr_image_api::config::ServiceConfig {
        strict_ocr_method: true,
        ..test_config(&tmp)
    };
    let state = test_state_with(fake_engines(), config);
    let png = png_bytes(8, 8);

    let response = send(
        &state,
        upload_request(&[Part::File("image", &png), Part::Text("ocr_method", "Keras")]),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].as_str().unwrap().contains("Keras"));
}

#[tokio::test]
async fn test_undecodable_image_returns_400() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);

    let response = send(
        &state,
        upload_request(&[
            Part::File("image", b"definitely not an image"),
            Part::Text("ocr_method", "keras"),
        ]),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid image"));
}

#[tokio::test]
async fn test_unavailable_engine_returns_503() {
    let tmp = TempDir::new().unwrap();
    let engines = OcrEngines::new(
        None,
        Some(Arc::new(FakeEngine::new(OcrMethod::EasyOcr, vec!["x"]))),
    );
    let state = test_state_with(engines, test_config(&tmp));
    let png = png_bytes(8, 8);

    let response = send(
        &state,
        upload_request(&[Part::File("image", &png), Part::Text("ocr_method", "keras")]),
    )
    .await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.json()["error"],
        "OCR engine 'keras' not available"
    );
}

#[tokio::test]
async fn test_engine_failure_returns_500() {
    let tmp = TempDir::new().unwrap();
    let engines = OcrEngines::new(Some(Arc::new(FailingEngine)), None);
    let state = test_state_with(engines, test_config(&tmp));
    let png = png_bytes(8, 8);

    let response = send(
        &state,
        upload_request(&[Part::File("image", &png), Part::Text("ocr_method", "keras")]),
    )
    .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.json()["error"]
        .as_str()
        .unwrap()
        .contains("model exploded"));

    // Nothing was stored
    let stored = std::fs::read_dir(state.store.dir()).unwrap().count();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = ocr_image_api::config::ServiceConfig {
        max_upload_bytes: 1024,
        ..test_config(&tmp)
    };
    let state = test_state_with(fake_engines(), config);
    let big = vec![0u8; 64 * 1024];

    let response = send(
        &state,
        upload_request(&[Part::File("image", &big), Part::Text("ocr_method", "keras")]),
    )
    .await;

    assert!(response.status.is_client_error(), "got {}", response.status);
}

#[tokio::test]
async fn test_public_base_url_is_used() {
    let tmp = TempDir::new().unwrap();
    let config = ocr_image_api::config::ServiceConfig {
        public_base_url: Some("https://ocr.example.com".to_string()),
        ..test_config(&tmp)
    };
    let state = test_state_with(fake_engines(), config);
    let png = png_bytes(8, 8);

    let response = send(
        &state,
        upload_request(&[Part::File("image", &png), Part::Text("ocr_method", "keras")]),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.json()["image_url"]
        .as_str()
        .unwrap()
        .starts_with("https://ocr.example.com/download/"));
}

#[tokio::test]
async fn test_concurrent_uploads_get_distinct_files() {
    let tmp = TempDir::new().unwrap();
    let slow_keras = FakeEngine {
        delay: Duration::from_millis(50),
        ..FakeEngine::new(OcrMethod::Keras, vec!["first"])
    };
    let slow_easy = FakeEngine {
        delay: Duration::from_millis(50),
        ..FakeEngine::new(OcrMethod::EasyOcr, vec!["second"])
    };
    let engines = OcrEngines::new(Some(Arc::new(slow_keras)), Some(Arc::new(slow_easy)));
    let state = test_state_with(engines, test_config(&tmp));

    let ((text_a, path_a), (text_b, path_b)) =
        tokio::join!(upload(&state, "keras"), upload(&state, "easyocr"));

    assert_eq!(text_a, "first");
    assert_eq!(text_b, "second");
    assert_ne!(path_a, path_b);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp);
    let png = png_bytes(8, 8);

    let mut request =
        upload_request(&[Part::File("image", &png), Part::Text("ocr_method", "keras")]);
    request
        .headers_mut()
        .insert(header::ORIGIN, "http://frontend.local".parse().unwrap());
    let response = send(&state, request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

/// Round trip with real models; needs exported models under ./models
#[tokio::test]
#[ignore]
async fn test_real_models_find_printed_text() {
    use ocr_image_api::vision::{OcrModelConfig, Annotator};

    let tmp = TempDir::new().unwrap();
    let engines = OcrEngines::load(OcrModelConfig::default()).await.unwrap();
    let config = test_config(&tmp);
    let store = ocr_image_api::storage::OutputStore::new(&config.output_dir, config.delete_delay())
        .unwrap();
    let state = ocr_image_api::api::AppState::new(engines, Annotator::default(), store, config);

    let fixture = std::fs::read("tests/fixtures/hello_world.jpg").unwrap();
    for method in ["keras", "easyocr"] {
        let response = send(
            &state,
            upload_request(&[Part::File("image", &fixture), Part::Text("ocr_method", method)]),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);

        let text = response.json()["text"]
            .as_str()
            .unwrap()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        assert!(text.contains("hello"), "{}: got {:?}", method, text);
    }
}
