// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR engines for text extraction from images
//!
//! Both engines run ONNX models on CPU.
//!
//! Components:
//! - `detection` - Text region detection (CRAFT-style score maps)
//! - `recognition` - CRNN recognition with CTC decoding
//! - `preprocessing` - Image preprocessing for models
//! - `pipeline` - Detection followed by recognition
//! - `keras` / `easyocr` - The two selectable engines
//! - `model` - Shared result types and the `OcrEngine` trait

pub mod detection;
pub mod easyocr;
pub mod keras;
pub mod model;
pub mod pipeline;
pub mod preprocessing;
pub mod recognition;
mod session;

pub use detection::{BoxGeometry, DetectedBox, DetectorConfig, TextDetector};
pub use easyocr::EasyOcrEngine;
pub use keras::KerasOcrEngine;
pub use model::{
    AnnotationStyle, OcrEngine, OcrMethod, Point2, Quad, RecognitionResult, TextRegion,
    UnknownMethod,
};
pub use recognition::{BlankIndex, CtcDecoder, RecognizedText, TextRecognizer};
