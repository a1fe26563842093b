// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based text extraction
//!
//! This module provides:
//! - OCR (Optical Character Recognition) via two selectable ONNX engines
//! - Annotation of recognized regions onto the uploaded image
//!
//! Inference runs on CPU only.

pub mod annotate;
pub mod image_utils;
pub mod model_manager;
pub mod ocr;

pub use annotate::Annotator;
pub use image_utils::{decode_image_bytes, detect_format, encode_jpeg, ImageError, ImageInfo};
pub use model_manager::{EngineError, EngineInfo, OcrEngines, OcrModelConfig};
pub use ocr::{OcrEngine, OcrMethod, RecognitionResult};
