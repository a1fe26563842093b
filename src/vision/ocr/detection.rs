// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text region detection
//!
//! Runs a CRAFT-style detector that produces a character region score map
//! (and optionally an affinity map linking characters into words), then
//! groups thresholded pixels into connected components and turns each
//! component into a quadrilateral in original image coordinates.

use anyhow::{Context, Result};
use image::DynamicImage;
use imageproc::geometry::min_area_rect;
use imageproc::point::Point;
use ndarray::{Array2, ArrayViewD, IxDyn};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::model::{Point2, Quad};
use super::preprocessing::{preprocess_for_detection, PreprocessInfo, TensorLayout};
use super::session::{io_names, load_cpu_session, lock_session};

/// How a component's pixels are turned into a quadrilateral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxGeometry {
    /// Rotated minimum-area rectangle around the component
    MinAreaRect,
    /// Axis-aligned bounding box of the component
    AxisAligned,
}

/// Detector input and post-processing settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Side of the padded square fed to the model
    pub input_size: u32,
    pub layout: TensorLayout,
    /// Peak region score a component needs to be kept
    pub text_threshold: f32,
    /// Region score for a pixel to belong to text
    pub low_text: f32,
    /// Affinity score for a pixel to link neighbouring characters
    pub link_threshold: f32,
    /// Components smaller than this (in score map pixels) are noise
    pub min_component_pixels: usize,
    pub geometry: BoxGeometry,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            layout: TensorLayout::Nchw,
            text_threshold: 0.7,
            low_text: 0.4,
            link_threshold: 0.4,
            min_component_pixels: 10,
            geometry: BoxGeometry::AxisAligned,
        }
    }
}

/// A detected text region in original image coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedBox {
    pub quad: Quad,
    /// Peak region score inside the component
    pub score: f32,
}

/// Region and affinity scores at score map resolution
#[derive(Debug, Clone)]
pub struct ScoreMap {
    pub region: Array2<f32>,
    pub affinity: Option<Array2<f32>>,
}

impl ScoreMap {
    /// Interpret raw detector output
    ///
    /// Accepted shapes: `[1, H, W, 2]` and `[1, 2, H, W]` (region + affinity),
    /// `[1, 1, H, W]` and `[1, H, W]` (region only).
    pub fn from_output(output: &ArrayViewD<f32>) -> Result<Self> {
        let shape = output.shape().to_vec();

        match shape.as_slice() {
            [1, h, w, 2] => Ok(Self {
                region: Array2::from_shape_fn((*h, *w), |(y, x)| output[IxDyn(&[0, y, x, 0])]),
                affinity: Some(Array2::from_shape_fn((*h, *w), |(y, x)| {
                    output[IxDyn(&[0, y, x, 1])]
                })),
            }),
            [1, 2, h, w] => Ok(Self {
                region: Array2::from_shape_fn((*h, *w), |(y, x)| output[IxDyn(&[0, 0, y, x])]),
                affinity: Some(Array2::from_shape_fn((*h, *w), |(y, x)| {
                    output[IxDyn(&[0, 1, y, x])]
                })),
            }),
            [1, 1, h, w] => Ok(Self {
                region: Array2::from_shape_fn((*h, *w), |(y, x)| output[IxDyn(&[0, 0, y, x])]),
                affinity: None,
            }),
            [1, h, w] => Ok(Self {
                region: Array2::from_shape_fn((*h, *w), |(y, x)| output[IxDyn(&[0, y, x])]),
                affinity: None,
            }),
            _ => anyhow::bail!("Unexpected detector output shape: {:?}", shape),
        }
    }

    /// (height, width)
    pub fn dim(&self) -> (usize, usize) {
        self.region.dim()
    }

    fn is_text(&self, y: usize, x: usize, config: &DetectorConfig) -> bool {
        if self.region[[y, x]] >= config.low_text {
            return true;
        }
        self.affinity
            .as_ref()
            .map(|a| a[[y, x]] >= config.link_threshold)
            .unwrap_or(false)
    }
}

/// A 4-connected group of text pixels in the score map
#[derive(Debug, Clone)]
pub struct Component {
    pub pixels: Vec<(usize, usize)>,
    pub min_x: usize,
    pub max_x: usize,
    pub min_y: usize,
    pub max_y: usize,
    pub peak: f32,
}

impl Component {
    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    /// Margin added around the component, growing with its thickness
    pub fn dilation(&self) -> f32 {
        let (w, h) = (self.width() as f32, self.height() as f32);
        let size = self.pixels.len() as f32;
        ((size * w.min(h) / (w * h)).sqrt() * 2.0).floor()
    }
}

/// Group text pixels into connected components and drop the weak/small ones
pub fn find_components(map: &ScoreMap, config: &DetectorConfig) -> Vec<Component> {
    let (height, width) = map.dim();
    let mut visited = vec![vec![false; width]; height];
    let mut components = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if visited[y][x] || !map.is_text(y, x, config) {
                continue;
            }

            let component = flood_fill(map, config, &mut visited, x, y);
            if component.pixels.len() >= config.min_component_pixels
                && component.peak >= config.text_threshold
            {
                components.push(component);
            }
        }
    }

    components
}

fn flood_fill(
    map: &ScoreMap,
    config: &DetectorConfig,
    visited: &mut [Vec<bool>],
    start_x: usize,
    start_y: usize,
) -> Component {
    let (height, width) = map.dim();
    let mut stack = vec![(start_x, start_y)];
    let mut component = Component {
        pixels: Vec::new(),
        min_x: start_x,
        max_x: start_x,
        min_y: start_y,
        max_y: start_y,
        peak: 0.0,
    };

    while let Some((x, y)) = stack.pop() {
        if visited[y][x] || !map.is_text(y, x, config) {
            continue;
        }
        visited[y][x] = true;

        component.pixels.push((x, y));
        component.peak = component.peak.max(map.region[[y, x]]);
        component.min_x = component.min_x.min(x);
        component.max_x = component.max_x.max(x);
        component.min_y = component.min_y.min(y);
        component.max_y = component.max_y.max(y);

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }

    component
}

fn unit(dx: f32, dy: f32) -> (f32, f32) {
    let len = (dx * dx + dy * dy).sqrt();
    if len < f32::EPSILON {
        (0.0, 0.0)
    } else {
        (dx / len, dy / len)
    }
}

/// Grow an ordered quad outward by `margin` along its own edge directions
fn expand_quad(quad: Quad, margin: f32) -> Quad {
    let [tl, tr, br, bl] = quad.0;
    let (ux, uy) = unit(tr.x - tl.x, tr.y - tl.y);
    let (mut vx, mut vy) = unit(bl.x - tl.x, bl.y - tl.y);
    if vx == 0.0 && vy == 0.0 {
        (vx, vy) = (-uy, ux);
    }

    let shift = |p: Point2, su: f32, sv: f32| {
        Point2::new(
            p.x + margin * (su * ux + sv * vx),
            p.y + margin * (su * uy + sv * vy),
        )
    };

    Quad([
        shift(tl, -1.0, -1.0),
        shift(tr, 1.0, -1.0),
        shift(br, 1.0, 1.0),
        shift(bl, -1.0, 1.0),
    ])
}

fn component_quad(component: &Component, geometry: BoxGeometry) -> Quad {
    let axis_aligned = Quad::from_rect(
        component.min_x as f32,
        component.min_y as f32,
        (component.max_x + 1) as f32,
        (component.max_y + 1) as f32,
    );

    if geometry == BoxGeometry::AxisAligned {
        return axis_aligned;
    }

    let points: Vec<Point<i32>> = component
        .pixels
        .iter()
        .map(|&(x, y)| Point::new(x as i32, y as i32))
        .collect();
    let corners = min_area_rect(&points).map(|p| Point2::new(p.x as f32, p.y as f32));
    let rotated = Quad::ordered(corners);

    let (w, h) = rotated.edge_lengths();
    if w < 1.0 || h < 1.0 {
        // Collinear pixels have no meaningful orientation
        return axis_aligned;
    }
    // Pixel indices mark cell corners; cover the far cells too
    expand_quad(rotated, 0.5)
}

/// Map components from score map space to quads in original image space
pub fn boxes_from_components(
    components: &[Component],
    map_dim: (usize, usize),
    info: &PreprocessInfo,
    config: &DetectorConfig,
) -> Vec<DetectedBox> {
    let (map_h, map_w) = map_dim;
    if map_h == 0 || map_w == 0 {
        return Vec::new();
    }
    let scale_x = config.input_size as f32 / map_w as f32;
    let scale_y = config.input_size as f32 / map_h as f32;

    let mut boxes: Vec<DetectedBox> = components
        .iter()
        .map(|component| {
            let quad = expand_quad(
                component_quad(component, config.geometry),
                component.dilation(),
            );
            let mapped = quad.0.map(|p| {
                let (x, y) = info.map_to_original(p.x * scale_x, p.y * scale_y);
                Point2::new(x, y)
            });
            DetectedBox {
                quad: Quad::ordered(mapped),
                score: component.peak,
            }
        })
        .collect();

    // Reading order: top to bottom, then left to right
    boxes.sort_by(|a, b| {
        let (ay, by) = (a.quad.top_left().y, b.quad.top_left().y);
        ay.partial_cmp(&by)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.quad
                    .top_left()
                    .x
                    .partial_cmp(&b.quad.top_left().x)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });

    boxes
}

/// ONNX text detection model
///
/// Runs on CPU only. The session is shared between clones and guarded by a
/// mutex since ONNX Runtime needs exclusive access to run it.
#[derive(Clone)]
pub struct TextDetector {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
    config: DetectorConfig,
}

impl std::fmt::Debug for TextDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextDetector")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TextDetector {
    /// Load the detection model from a file
    ///
    /// # Errors
    /// Returns error if the model file is missing or ONNX Runtime cannot load it.
    pub fn new<P: AsRef<Path>>(model_path: P, config: DetectorConfig) -> Result<Self> {
        let model_path = model_path.as_ref();
        info!("Loading text detection model from {}", model_path.display());

        let session = load_cpu_session(model_path, "Text detection model")?;
        let (input_name, output_name) = io_names(&session, "input", "output");

        debug!(
            "Detection model loaded - input: {}, output: {}",
            input_name, output_name
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
            config,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect text regions in an image
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<DetectedBox>> {
        let (input, info) = preprocess_for_detection(image, self.config.input_size, self.config.layout);

        let mut session = lock_session(&self.session, "Detection")?;
        let input_value = Value::from_array(input).context("Failed to create input tensor")?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract detector output")?;
        let map = ScoreMap::from_output(&output_tensor)?;

        let components = find_components(&map, &self.config);
        let boxes = boxes_from_components(&components, map.dim(), &info, &self.config);

        debug!("Detected {} text regions", boxes.len());
        Ok(boxes)
    }
}
