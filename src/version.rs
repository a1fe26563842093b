// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the OCR image API

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "keras-ocr",
    "easyocr",
    "annotated-output",
    "one-shot-download",
    "output-ttl-sweep",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("OCR Image API {}", VERSION_NUMBER)
}
