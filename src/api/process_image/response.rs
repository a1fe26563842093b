// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image processing response types

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;

/// Response from `/procesar-imagen`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessImageResponse {
    /// Recognized strings joined by single spaces
    pub text: String,
    /// Absolute URL of the annotated image
    pub image_url: String,
}

impl ProcessImageResponse {
    pub fn new(text: String, base_url: &str, filename: &str) -> Self {
        Self {
            text,
            image_url: download_url(base_url, filename),
        }
    }
}

/// `<base>/download/<filename>`
pub fn download_url(base_url: &str, filename: &str) -> String {
    format!("{}/download/{}", base_url.trim_end_matches('/'), filename)
}

/// Base URL for generated links: configured public URL, else the request's Host
pub fn base_url(config: &ServiceConfig, headers: &HeaderMap) -> String {
    if let Some(ref url) = config.public_base_url {
        return url.clone();
    }

    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|host| format!("http://{}", host))
        .unwrap_or_else(|| format!("http://{}:{}", config.host, config.port))
}
