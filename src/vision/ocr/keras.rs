// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! "keras" engine: CRAFT detector + CRNN recognizer exported from Keras
//!
//! Expected files in the model directory:
//! - `detector.onnx`: NHWC input, `[1, H/2, W/2, 2]` region/affinity output
//! - `recognizer.onnx`: NHWC 31x200 grayscale input, blank-last CTC output
//!
//! Regions are reported as rotated quadrilaterals.

use anyhow::Result;
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

use super::detection::{BoxGeometry, DetectorConfig, TextDetector};
use super::model::{OcrEngine, OcrMethod, RecognitionResult, TextRegion};
use super::pipeline::DetectRecognizePipeline;
use super::preprocessing::{RecognizerInput, TensorLayout};
use super::recognition::{BlankIndex, CtcDecoder, TextRecognizer};

/// Default recognizer alphabet (digits and lowercase letters)
pub const KERAS_ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyz";

pub const DETECTOR_CONFIG: DetectorConfig = DetectorConfig {
    input_size: 640,
    layout: TensorLayout::Nhwc,
    text_threshold: 0.7,
    low_text: 0.4,
    link_threshold: 0.4,
    min_component_pixels: 10,
    geometry: BoxGeometry::MinAreaRect,
};

pub const RECOGNIZER_INPUT: RecognizerInput = RecognizerInput {
    height: 31,
    width: Some(200),
    max_width: 200,
    mean: 0.0,
    std: 1.0,
    layout: TensorLayout::Nhwc,
};

/// Deep detector/recognizer engine
#[derive(Debug, Clone)]
pub struct KerasOcrEngine {
    pipeline: DetectRecognizePipeline,
}

impl KerasOcrEngine {
    /// Load both models from `model_dir`
    pub fn load<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let dir = model_dir.as_ref();
        let detector = TextDetector::new(dir.join("detector.onnx"), DETECTOR_CONFIG)?;
        let decoder = CtcDecoder::new(KERAS_ALPHABET.chars().collect(), BlankIndex::Last);
        let recognizer = TextRecognizer::new(dir.join("recognizer.onnx"), decoder, RECOGNIZER_INPUT)?;

        debug!("keras OCR engine ready: {}", dir.display());
        Ok(Self {
            pipeline: DetectRecognizePipeline::new(detector, recognizer),
        })
    }
}

impl OcrEngine for KerasOcrEngine {
    fn method(&self) -> OcrMethod {
        OcrMethod::Keras
    }

    fn recognize(&self, image: &DynamicImage) -> Result<RecognitionResult> {
        let regions = self
            .pipeline
            .run(image)?
            .into_iter()
            .map(|(quad, recognized)| TextRegion {
                text: recognized.text,
                quad,
                confidence: None,
            })
            .collect();

        Ok(RecognitionResult::new(
            regions,
            OcrMethod::Keras.annotation_style(),
        ))
    }
}
