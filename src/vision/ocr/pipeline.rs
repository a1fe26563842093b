// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection followed by per-region recognition

use anyhow::Result;
use image::DynamicImage;
use std::time::Instant;
use tracing::{debug, trace};

use super::detection::TextDetector;
use super::model::Quad;
use super::recognition::{RecognizedText, TextRecognizer};

/// A detector and recognizer run back to back on one image
#[derive(Debug, Clone)]
pub struct DetectRecognizePipeline {
    detector: TextDetector,
    recognizer: TextRecognizer,
}

impl DetectRecognizePipeline {
    pub fn new(detector: TextDetector, recognizer: TextRecognizer) -> Self {
        Self {
            detector,
            recognizer,
        }
    }

    /// Regions with non-empty text, in reading order
    pub fn run(&self, image: &DynamicImage) -> Result<Vec<(Quad, RecognizedText)>> {
        let start = Instant::now();
        let boxes = self.detector.detect(image)?;
        let gray = image.to_luma8();

        let mut regions = Vec::with_capacity(boxes.len());
        for detected in boxes {
            let recognized = self.recognizer.recognize(&gray, &detected.quad)?;
            trace!(
                "Region peak score {:.2} -> {:?}",
                detected.score,
                recognized.text
            );
            if !recognized.is_empty() {
                regions.push((detected.quad, recognized));
            }
        }

        debug!(
            "Recognized {} regions in {}ms (detector input {}px)",
            regions.len(),
            start.elapsed().as_millis(),
            self.detector.config().input_size
        );
        Ok(regions)
    }
}
