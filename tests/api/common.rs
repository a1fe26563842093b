// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared helpers for endpoint tests: fake engines, state and request builders

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, Request, StatusCode},
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ocr_image_api::{
    api::{create_router, AppState},
    config::ServiceConfig,
    storage::OutputStore,
    vision::{
        ocr::{Quad, TextRegion},
        Annotator, OcrEngine, OcrEngines, OcrMethod, RecognitionResult,
    },
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const HOST: &str = "testserver";
pub const BOUNDARY: &str = "ocr-test-boundary";

/// Engine returning fixed regions, optionally after a delay
pub struct FakeEngine {
    pub method: OcrMethod,
    pub texts: Vec<&'static str>,
    pub delay: Duration,
}

impl FakeEngine {
    pub fn new(method: OcrMethod, texts: Vec<&'static str>) -> Self {
        Self {
            method,
            texts,
            delay: Duration::ZERO,
        }
    }
}

impl OcrEngine for FakeEngine {
    fn method(&self) -> OcrMethod {
        self.method
    }

    fn recognize(&self, image: &DynamicImage) -> Result<RecognitionResult> {
        std::thread::sleep(self.delay);

        let row_height = (image.height() / (self.texts.len() as u32 + 1)).max(2) as f32;
        let width = image.width() as f32;
        let regions = self
            .texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let y = row_height * i as f32 + 1.0;
                TextRegion {
                    text: text.to_string(),
                    quad: Quad::from_rect(1.0, y, width - 2.0, y + row_height - 1.0),
                    confidence: match self.method {
                        OcrMethod::EasyOcr => Some(0.9),
                        OcrMethod::Keras => None,
                    },
                }
            })
            .collect();

        Ok(RecognitionResult::new(regions, self.method.annotation_style()))
    }
}

/// Engine reporting a single region at a fixed position
pub struct PlacedEngine {
    pub method: OcrMethod,
    pub text: &'static str,
    pub quad: Quad,
}

impl OcrEngine for PlacedEngine {
    fn method(&self) -> OcrMethod {
        self.method
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<RecognitionResult> {
        let region = TextRegion {
            text: self.text.to_string(),
            quad: self.quad,
            confidence: None,
        };
        Ok(RecognitionResult::new(vec![region], self.method.annotation_style()))
    }
}

/// Engine whose inference always fails
pub struct FailingEngine;

impl OcrEngine for FailingEngine {
    fn method(&self) -> OcrMethod {
        OcrMethod::Keras
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<RecognitionResult> {
        anyhow::bail!("model exploded")
    }
}

pub fn fake_engines() -> OcrEngines {
    OcrEngines::new(
        Some(Arc::new(FakeEngine::new(OcrMethod::Keras, vec!["hello"]))),
        Some(Arc::new(FakeEngine::new(OcrMethod::EasyOcr, vec!["hello", "world"]))),
    )
}

pub fn test_config(tmp: &TempDir) -> ServiceConfig {
    ServiceConfig {
        output_dir: tmp.path().join("processed_images"),
        download_delete_delay_ms: 100,
        ..Default::default()
    }
}

pub fn test_state_with(engines: OcrEngines, config: ServiceConfig) -> AppState {
    let store = OutputStore::new(&config.output_dir, config.delete_delay()).unwrap();
    AppState::new(engines, Annotator::default(), store, config)
}

pub fn test_state(tmp: &TempDir) -> AppState {
    test_state_with(fake_engines(), test_config(tmp))
}

/// A small white PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// One part of a multipart body
pub enum Part<'a> {
    File(&'a str, &'a [u8]),
    Text(&'a str, &'a str),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File(name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.png\"\r\nContent-Type: image/png\r\n\r\n",
                        name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}", name, value)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/procesar-imagen")
        .header(header::HOST, HOST)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::HOST, HOST)
        .body(Body::empty())
        .unwrap()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub async fn send(state: &AppState, request: Request<Body>) -> TestResponse {
    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Upload a PNG with the given method, returning the download path from `image_url`
pub async fn upload(state: &AppState, method: &str) -> (String, String) {
    upload_image(state, method, &png_bytes(64, 32)).await
}

pub async fn upload_image(state: &AppState, method: &str, image: &[u8]) -> (String, String) {
    let response = send(
        state,
        upload_request(&[Part::File("image", image), Part::Text("ocr_method", method)]),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "body: {:?}", response.body);

    let json = response.json();
    let text = json["text"].as_str().unwrap().to_string();
    let url = json["image_url"].as_str().unwrap();
    let path = url
        .strip_prefix(&format!("http://{}", HOST))
        .unwrap_or_else(|| panic!("unexpected image_url {}", url))
        .to_string();
    (text, path)
}
