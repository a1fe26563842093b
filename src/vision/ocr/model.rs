// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Recognition result types and the engine abstraction shared by both OCR pipelines

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use image::DynamicImage;

/// OCR method selected by the `ocr_method` form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrMethod {
    /// Deep detector/recognizer pipeline with rotated quadrilateral output
    Keras,
    /// General OCR reader with box, text and confidence output
    EasyOcr,
}

impl OcrMethod {
    pub const ALL: [OcrMethod; 2] = [OcrMethod::Keras, OcrMethod::EasyOcr];

    pub fn as_str(&self) -> &'static str {
        match self {
            OcrMethod::Keras => "keras",
            OcrMethod::EasyOcr => "easyocr",
        }
    }

    /// Annotation style native to this engine's geometry
    pub fn annotation_style(&self) -> AnnotationStyle {
        match self {
            OcrMethod::Keras => AnnotationStyle::Polygon,
            OcrMethod::EasyOcr => AnnotationStyle::Rectangle,
        }
    }
}

impl fmt::Display for OcrMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized method name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized OCR method '{0}'")]
pub struct UnknownMethod(pub String);

impl FromStr for OcrMethod {
    type Err = UnknownMethod;

    /// Matching is exact: `"Keras"` is not `"keras"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keras" => Ok(OcrMethod::Keras),
            "easyocr" => Ok(OcrMethod::EasyOcr),
            other => Err(UnknownMethod(other.to_string())),
        }
    }
}

/// A point in original image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Four corners of a text region: top-left, top-right, bottom-right, bottom-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad(pub [Point2; 4]);

impl Quad {
    /// Axis-aligned quad spanning `(x0, y0)` to `(x1, y1)`
    pub fn from_rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Quad([
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ])
    }

    /// Order arbitrary corners as top-left, top-right, bottom-right, bottom-left
    ///
    /// Corners are sorted clockwise around their centroid, then rotated so the
    /// corner with the smallest `x + y` comes first.
    pub fn ordered(points: [Point2; 4]) -> Self {
        let cx = points.iter().map(|p| p.x).sum::<f32>() / 4.0;
        let cy = points.iter().map(|p| p.y).sum::<f32>() / 4.0;

        let mut sorted = points;
        // Image y grows downwards, so ascending atan2 walks clockwise on screen
        sorted.sort_by(|a, b| {
            let ka = (a.y - cy).atan2(a.x - cx);
            let kb = (b.y - cy).atan2(b.x - cx);
            ka.total_cmp(&kb)
        });

        let start = (0..4)
            .min_by(|&i, &j| {
                let si = sorted[i].x + sorted[i].y;
                let sj = sorted[j].x + sorted[j].y;
                si.total_cmp(&sj)
            })
            .unwrap_or(0);
        sorted.rotate_left(start);

        Quad(sorted)
    }

    pub fn top_left(&self) -> Point2 {
        self.0[0]
    }

    pub fn bottom_right(&self) -> Point2 {
        self.0[2]
    }

    pub fn points(&self) -> &[Point2; 4] {
        &self.0
    }

    /// Smallest axis-aligned box containing all corners: (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        self.0.iter().fold(
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        )
    }

    /// Length of the top and left edges
    pub fn edge_lengths(&self) -> (f32, f32) {
        let [tl, tr, _, bl] = self.0;
        let width = ((tr.x - tl.x).powi(2) + (tr.y - tl.y).powi(2)).sqrt();
        let height = ((bl.x - tl.x).powi(2) + (bl.y - tl.y).powi(2)).sqrt();
        (width, height)
    }
}

/// One recognized piece of text and where it was found
#[derive(Debug, Clone, PartialEq)]
pub struct TextRegion {
    pub text: String,
    pub quad: Quad,
    /// Recognizer confidence, when the engine reports one
    pub confidence: Option<f32>,
}

/// How regions are drawn onto the output image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationStyle {
    /// Outline the full quadrilateral
    Polygon,
    /// Outline the rectangle from top-left to bottom-right corner
    Rectangle,
}

/// Regions produced by one engine for one image
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub regions: Vec<TextRegion>,
    pub style: AnnotationStyle,
}

impl RecognitionResult {
    pub fn new(regions: Vec<TextRegion>, style: AnnotationStyle) -> Self {
        Self { regions, style }
    }

    /// Result of an unrecognized method: nothing to draw, no text
    pub fn empty() -> Self {
        Self {
            regions: Vec::new(),
            style: AnnotationStyle::Rectangle,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Recognized strings joined with single spaces, in engine order
    pub fn text(&self) -> String {
        self.regions
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// An OCR pipeline loaded once at startup and shared across requests
#[cfg_attr(test, mockall::automock)]
pub trait OcrEngine: Send + Sync {
    fn method(&self) -> OcrMethod;

    /// Detect and recognize all text in `image`
    fn recognize(&self, image: &DynamicImage) -> Result<RecognitionResult>;
}
