// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the OCR detector and recognizer models

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, Rgb, RgbImage};
use ndarray::Array4;

/// Mean values for detector normalization (ImageNet)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for detector normalization (ImageNet)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Memory layout a model expects for its image input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// [batch, channels, height, width] (PyTorch exports)
    Nchw,
    /// [batch, height, width, channels] (Keras exports)
    Nhwc,
}

impl TensorLayout {
    fn zeros(&self, channels: usize, height: usize, width: usize) -> Array4<f32> {
        match self {
            TensorLayout::Nchw => Array4::zeros((1, channels, height, width)),
            TensorLayout::Nhwc => Array4::zeros((1, height, width, channels)),
        }
    }

    fn set(&self, tensor: &mut Array4<f32>, c: usize, y: usize, x: usize, value: f32) {
        match self {
            TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
            TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
        }
    }
}

/// Input geometry and normalization for a recognizer model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognizerInput {
    /// Crop height fed to the model
    pub height: u32,
    /// Fixed crop width; `None` keeps the aspect ratio
    pub width: Option<u32>,
    /// Upper bound for aspect-preserving widths
    pub max_width: u32,
    /// Grayscale normalization: (pixel / 255 - mean) / std
    pub mean: f32,
    pub std: f32,
    pub layout: TensorLayout,
}

impl RecognizerInput {
    /// Width a crop of the given size is resized to
    pub fn target_width(&self, crop_width: f32, crop_height: f32) -> u32 {
        if let Some(width) = self.width {
            return width;
        }
        if crop_height <= 0.0 {
            return 4;
        }
        let scaled = (crop_width * self.height as f32 / crop_height).ceil() as u32;
        scaled.clamp(4, self.max_width)
    }
}

/// Preprocess an image for text detection
///
/// Steps:
/// 1. Resize with aspect ratio preservation and pad to `target_size` square
/// 2. Normalize with ImageNet mean/std: (pixel/255 - mean) / std
/// 3. Lay out as a [1, 3, H, W] or [1, H, W, 3] tensor
///
/// Returns the tensor and the info needed to map detections back.
pub fn preprocess_for_detection(
    image: &DynamicImage,
    target_size: u32,
    layout: TensorLayout,
) -> (Array4<f32>, PreprocessInfo) {
    let info = PreprocessInfo::new(image, target_size);
    let rgb = resize_with_padding(image, target_size).to_rgb8();

    let size = target_size as usize;
    let mut tensor = layout.zeros(3, size, size);

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            let normalized = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
            layout.set(&mut tensor, c, y as usize, x as usize, normalized);
        }
    }

    (tensor, info)
}

/// Preprocess a grayscale text crop for recognition
///
/// The crop is resized to the recognizer's height (and fixed width, if any)
/// and normalized into a single-channel tensor.
pub fn preprocess_for_recognition(crop: &GrayImage, input: &RecognizerInput) -> Array4<f32> {
    let (w, h) = crop.dimensions();
    let target_w = input.target_width(w as f32, h as f32);
    let resized = if (w, h) == (target_w, input.height) {
        crop.clone()
    } else {
        imageops::resize(crop, target_w, input.height, FilterType::Triangle)
    };

    let mut tensor = input
        .layout
        .zeros(1, input.height as usize, target_w as usize);

    for (x, y, pixel) in resized.enumerate_pixels() {
        let normalized = (pixel[0] as f32 / 255.0 - input.mean) / input.std;
        input
            .layout
            .set(&mut tensor, 0, y as usize, x as usize, normalized);
    }

    tensor
}

/// Resize image with aspect ratio preservation and padding
///
/// The image is scaled to fit within target_size x target_size
/// while preserving aspect ratio, then centered on a black square.
pub fn resize_with_padding(image: &DynamicImage, target_size: u32) -> DynamicImage {
    let info = PreprocessInfo::new(image, target_size);
    let mut output = RgbImage::from_pixel(target_size, target_size, Rgb([0, 0, 0]));

    if info.original_width == 0 || info.original_height == 0 {
        return DynamicImage::ImageRgb8(output);
    }

    let (new_w, new_h) = info.scaled_size();
    let resized = image
        .resize_exact(new_w, new_h, FilterType::Triangle)
        .to_rgb8();
    imageops::overlay(
        &mut output,
        &resized,
        info.offset_x as i64,
        info.offset_y as i64,
    );

    DynamicImage::ImageRgb8(output)
}

/// Scaling factor and offsets used during preprocessing
/// Used for mapping detection results back to original coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessInfo {
    /// Scale factor applied
    pub scale: f32,
    /// X offset from padding
    pub offset_x: u32,
    /// Y offset from padding
    pub offset_y: u32,
    /// Original image width
    pub original_width: u32,
    /// Original image height
    pub original_height: u32,
}

impl PreprocessInfo {
    /// Calculate preprocessing info for an image
    pub fn new(image: &DynamicImage, target_size: u32) -> Self {
        let (orig_w, orig_h) = image.dimensions();

        if orig_w == 0 || orig_h == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0,
                offset_y: 0,
                original_width: orig_w,
                original_height: orig_h,
            };
        }

        let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
        let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
        let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);

        Self {
            scale,
            offset_x: (target_size - new_w) / 2,
            offset_y: (target_size - new_h) / 2,
            original_width: orig_w,
            original_height: orig_h,
        }
    }

    /// Size of the image content inside the padded square
    pub fn scaled_size(&self) -> (u32, u32) {
        let w = ((self.original_width as f32 * self.scale).round() as u32).max(1);
        let h = ((self.original_height as f32 * self.scale).round() as u32).max(1);
        (w, h)
    }

    /// Map a coordinate from preprocessed space back to original image space,
    /// clamped to the image bounds
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (
            orig_x.clamp(0.0, self.original_width as f32),
            orig_y.clamp(0.0, self.original_height as f32),
        )
    }
}
