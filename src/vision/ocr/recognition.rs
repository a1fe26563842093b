// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text recognition from detected regions
//!
//! Each detected quadrilateral is rectified into an upright grayscale crop,
//! run through a CRNN recognizer and decoded with greedy CTC.

use anyhow::{Context, Result};
use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use ndarray::{ArrayViewD, IxDyn};
use ort::session::Session;
use ort::value::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::model::Quad;
use super::preprocessing::{preprocess_for_recognition, RecognizerInput};
use super::session::{io_names, load_cpu_session, lock_session};

/// Recognized text with confidence score
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    /// The recognized text content
    pub text: String,
    /// Mean per-character probability (0.0-1.0)
    pub confidence: f32,
}

impl RecognizedText {
    pub fn new(text: String, confidence: f32) -> Self {
        Self { text, confidence }
    }

    /// Check if the text is empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Where the CTC blank sits among the model's output classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankIndex {
    /// Class 0 is blank, class i is `alphabet[i - 1]`
    First,
    /// Class `alphabet.len()` is blank, class i is `alphabet[i]`
    Last,
}

/// Greedy (best path) CTC decoder
#[derive(Debug, Clone)]
pub struct CtcDecoder {
    alphabet: Vec<char>,
    blank: BlankIndex,
}

impl CtcDecoder {
    pub fn new(alphabet: Vec<char>, blank: BlankIndex) -> Self {
        Self { alphabet, blank }
    }

    /// Read one character per line; a line holding a single space keeps it
    pub fn from_file<P: AsRef<Path>>(path: P, blank: BlankIndex) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Character list not found: {}", path.display());
        }
        let file = File::open(path)
            .with_context(|| format!("Failed to open character list: {}", path.display()))?;

        let mut alphabet = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.context("Failed to read character list line")?;
            let line = line.trim_end_matches('\r');
            if let Some(ch) = line.chars().next() {
                alphabet.push(ch);
            }
        }

        if alphabet.is_empty() {
            anyhow::bail!("Character list is empty: {}", path.display());
        }
        Ok(Self::new(alphabet, blank))
    }

    pub fn alphabet_len(&self) -> usize {
        self.alphabet.len()
    }

    fn char_for(&self, class: usize) -> Option<char> {
        match self.blank {
            BlankIndex::First if class == 0 => None,
            BlankIndex::First => self.alphabet.get(class - 1).copied(),
            BlankIndex::Last => self.alphabet.get(class).copied(),
        }
    }

    /// Decode a `[1, T, C]` or `[T, C]` probability tensor
    pub fn decode(&self, output: &ArrayViewD<f32>) -> Result<RecognizedText> {
        let shape = output.shape();
        let (seq_len, num_classes, batched) = match shape {
            [1, t, c] => (*t, *c, true),
            [t, c] => (*t, *c, false),
            _ => anyhow::bail!("Unexpected recognizer output shape: {:?}", shape),
        };

        let mut text = String::new();
        let mut total = 0.0f32;
        let mut count = 0usize;
        let mut prev_class: Option<usize> = None;

        for t in 0..seq_len {
            let mut best = (0usize, f32::NEG_INFINITY);
            for c in 0..num_classes {
                let prob = if batched {
                    output[IxDyn(&[0, t, c])]
                } else {
                    output[IxDyn(&[t, c])]
                };
                if prob > best.1 {
                    best = (c, prob);
                }
            }

            let (class, prob) = best;
            let ch = self.char_for(class);
            // Collapse repeats; a blank between two equal classes separates them
            if let Some(ch) = ch {
                if prev_class != Some(class) {
                    text.push(ch);
                    total += prob;
                    count += 1;
                }
                prev_class = Some(class);
            } else {
                prev_class = None;
            }
        }

        let confidence = if count == 0 {
            0.0
        } else {
            (total / count as f32).clamp(0.0, 1.0)
        };

        Ok(RecognizedText::new(text.trim().to_string(), confidence))
    }
}

/// Rectify a (possibly rotated) quad into an upright crop of its own size
pub fn crop_quad(image: &GrayImage, quad: &Quad) -> Option<GrayImage> {
    let (width, height) = quad.edge_lengths();
    let (w, h) = (width.round() as u32, height.round() as u32);
    if w == 0 || h == 0 {
        return None;
    }

    let [tl, tr, br, bl] = quad.0;
    let from = [(tl.x, tl.y), (tr.x, tr.y), (br.x, br.y), (bl.x, bl.y)];
    let to = [(0.0, 0.0), (w as f32, 0.0), (w as f32, h as f32), (0.0, h as f32)];
    let projection = Projection::from_control_points(from, to)?;

    let mut crop = GrayImage::new(w, h);
    warp_into(image, &projection, Interpolation::Bilinear, Luma([0]), &mut crop);
    Some(crop)
}

/// ONNX CRNN text recognition model
#[derive(Clone)]
pub struct TextRecognizer {
    session: Arc<Mutex<Session>>,
    decoder: Arc<CtcDecoder>,
    input: RecognizerInput,
    input_name: String,
    output_name: String,
}

impl std::fmt::Debug for TextRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRecognizer")
            .field("alphabet_size", &self.decoder.alphabet_len())
            .field("input", &self.input)
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl TextRecognizer {
    /// Load the recognition model
    ///
    /// # Errors
    /// Returns error if the model file is missing or ONNX Runtime cannot load it.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        decoder: CtcDecoder,
        input: RecognizerInput,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        info!("Loading text recognition model from {}", model_path.display());

        let session = load_cpu_session(model_path, "Text recognition model")?;
        let (input_name, output_name) = io_names(&session, "input", "output");

        debug!(
            "Recognition model loaded - input: {}, output: {}, alphabet: {} chars",
            input_name,
            output_name,
            decoder.alphabet_len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            decoder: Arc::new(decoder),
            input,
            input_name,
            output_name,
        })
    }

    /// Recognize the text inside one region of a grayscale image
    pub fn recognize(&self, image: &GrayImage, quad: &Quad) -> Result<RecognizedText> {
        let Some(crop) = crop_quad(image, quad) else {
            return Ok(RecognizedText::new(String::new(), 0.0));
        };
        let tensor = preprocess_for_recognition(&crop, &self.input);

        let mut session = lock_session(&self.session, "Recognition")?;
        let input_value = Value::from_array(tensor).context("Failed to create input tensor")?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Recognition inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract recognizer output")?;

        self.decoder.decode(&output_tensor)
    }
}
