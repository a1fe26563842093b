// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Draws recognized regions and their text onto a copy of the input image

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::debug;

use crate::vision::ocr::{AnnotationStyle, Point2, Quad, RecognitionResult};

/// Outline and label color for rectangle annotations
pub const RECT_COLOR: Rgb<u8> = Rgb([0, 128, 0]);

/// Outline and label color for polygon annotations
pub const POLYGON_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Label height in pixels
pub const LABEL_SCALE: f32 = 16.0;

/// Gap between a region's top edge and its label baseline
const LABEL_OFFSET: i32 = 10;

/// DejaVu Sans, used for labels unless another font is configured
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Parse the bundled label font
pub fn bundled_font() -> Result<FontArc> {
    FontArc::try_from_slice(BUNDLED_FONT)
        .map_err(|e| anyhow::anyhow!("Invalid bundled annotation font: {}", e))
}

/// Renders annotations; holds the label font loaded at startup
#[derive(Clone)]
pub struct Annotator {
    font: Option<FontArc>,
}

impl Default for Annotator {
    /// Labels use the bundled font
    fn default() -> Self {
        Self::new(bundled_font().ok())
    }
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl Annotator {
    /// Annotator with an explicit font; `None` draws outlines only
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    /// Load the label font from `font_path`, or the bundled font when unset
    pub fn load(font_path: Option<&Path>) -> Result<Self> {
        let Some(path) = font_path else {
            return Ok(Self::new(Some(bundled_font()?)));
        };

        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read annotation font {}", path.display()))?;
        let font = FontArc::try_from_vec(data)
            .map_err(|e| anyhow::anyhow!("Invalid annotation font {}: {}", path.display(), e))?;

        Ok(Self::new(Some(font)))
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Produce an annotated RGB copy of `image`
    pub fn render(&self, image: &DynamicImage, result: &RecognitionResult) -> RgbImage {
        let mut canvas = image.to_rgb8();

        for region in &result.regions {
            match result.style {
                AnnotationStyle::Rectangle => {
                    draw_rectangle(&mut canvas, &region.quad, RECT_COLOR);
                    let tl = region.quad.top_left();
                    self.draw_label(&mut canvas, tl, &region.text, RECT_COLOR);
                }
                AnnotationStyle::Polygon => {
                    draw_polygon(&mut canvas, &region.quad, POLYGON_COLOR);
                    let (x0, y0, _, _) = region.quad.bounds();
                    self.draw_label(&mut canvas, Point2::new(x0, y0), &region.text, POLYGON_COLOR);
                }
            }
        }

        debug!(
            "Rendered {} annotations on {}x{} image",
            result.regions.len(),
            canvas.width(),
            canvas.height()
        );
        canvas
    }

    /// Draw `text` so that its baseline sits just above `anchor`
    ///
    /// Regions touching the top edge get their label pinned to row 0.
    fn draw_label(&self, canvas: &mut RgbImage, anchor: Point2, text: &str, color: Rgb<u8>) {
        let Some(ref font) = self.font else {
            return;
        };
        if text.is_empty() {
            return;
        }

        let x = (anchor.x.round() as i32).max(0);
        let y = (anchor.y.round() as i32 - LABEL_OFFSET - LABEL_SCALE as i32).max(0);
        draw_text_mut(canvas, color, x, y, PxScale::from(LABEL_SCALE), font, text);
    }
}

/// 2 px outline of the rectangle spanned by the quad's top-left and bottom-right corners
fn draw_rectangle(canvas: &mut RgbImage, quad: &Quad, color: Rgb<u8>) {
    let (tl, br) = (quad.top_left(), quad.bottom_right());
    let x = tl.x.round() as i32;
    let y = tl.y.round() as i32;
    let w = (br.x - tl.x).round() as i32;
    let h = (br.y - tl.y).round() as i32;
    if w <= 0 || h <= 0 {
        return;
    }

    draw_hollow_rect_mut(canvas, Rect::at(x, y).of_size(w as u32, h as u32), color);
    if w > 2 && h > 2 {
        draw_hollow_rect_mut(
            canvas,
            Rect::at(x + 1, y + 1).of_size(w as u32 - 2, h as u32 - 2),
            color,
        );
    }
}

/// 2 px outline of all four quad edges
fn draw_polygon(canvas: &mut RgbImage, quad: &Quad, color: Rgb<u8>) {
    let points = quad.points();
    for i in 0..points.len() {
        let (a, b) = (points[i], points[(i + 1) % points.len()]);
        for (dx, dy) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)] {
            draw_line_segment_mut(canvas, (a.x + dx, a.y + dy), (b.x + dx, b.y + dy), color);
        }
    }
}
