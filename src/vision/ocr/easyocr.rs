// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! "easyocr" engine: general-purpose reader exported from PyTorch
//!
//! Expected files in the model directory:
//! - `detector.onnx`: NCHW input, `[1, H/2, W/2, 2]` region/affinity output
//! - `recognizer.onnx`: NCHW grayscale input of height 64, blank-first CTC output
//! - `characters.txt`: recognizer character list, one per line
//!
//! Regions are axis-aligned boxes with a recognition confidence.

use anyhow::Result;
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

use super::detection::{BoxGeometry, DetectorConfig, TextDetector};
use super::model::{OcrEngine, OcrMethod, RecognitionResult, TextRegion};
use super::pipeline::DetectRecognizePipeline;
use super::preprocessing::{RecognizerInput, TensorLayout};
use super::recognition::{BlankIndex, CtcDecoder, TextRecognizer};

pub const DETECTOR_CONFIG: DetectorConfig = DetectorConfig {
    input_size: 640,
    layout: TensorLayout::Nchw,
    text_threshold: 0.7,
    low_text: 0.4,
    link_threshold: 0.4,
    min_component_pixels: 10,
    geometry: BoxGeometry::AxisAligned,
};

pub const RECOGNIZER_INPUT: RecognizerInput = RecognizerInput {
    height: 64,
    width: None,
    max_width: 800,
    mean: 0.5,
    std: 0.5,
    layout: TensorLayout::Nchw,
};

/// General OCR reader engine
#[derive(Debug, Clone)]
pub struct EasyOcrEngine {
    pipeline: DetectRecognizePipeline,
}

impl EasyOcrEngine {
    /// Load the models and character list from `model_dir`
    pub fn load<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let dir = model_dir.as_ref();
        let detector = TextDetector::new(dir.join("detector.onnx"), DETECTOR_CONFIG)?;
        let decoder = CtcDecoder::from_file(dir.join("characters.txt"), BlankIndex::First)?;
        let recognizer = TextRecognizer::new(dir.join("recognizer.onnx"), decoder, RECOGNIZER_INPUT)?;

        debug!("easyocr engine ready: {}", dir.display());
        Ok(Self {
            pipeline: DetectRecognizePipeline::new(detector, recognizer),
        })
    }
}

impl OcrEngine for EasyOcrEngine {
    fn method(&self) -> OcrMethod {
        OcrMethod::EasyOcr
    }

    fn recognize(&self, image: &DynamicImage) -> Result<RecognitionResult> {
        let regions = self
            .pipeline
            .run(image)?
            .into_iter()
            .map(|(quad, recognized)| TextRegion {
                text: recognized.text,
                quad,
                confidence: Some(recognized.confidence),
            })
            .collect();

        Ok(RecognitionResult::new(
            regions,
            OcrMethod::EasyOcr.annotation_style(),
        ))
    }
}
