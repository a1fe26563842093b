// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image processing API endpoint module
//!
//! Provides POST /procesar-imagen for extracting text from an uploaded image.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::process_image_handler;
pub use request::{ProcessImageForm, ValidatedForm};
pub use response::ProcessImageResponse;
