// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart form parsing and validation for image processing

use axum::body::Bytes;
use axum::http::StatusCode;
use axum_extra::extract::multipart::{Multipart, MultipartError};
use tracing::debug;

use crate::api::errors::ApiError;
use crate::vision::OcrMethod;

/// Form field carrying the uploaded image
pub const IMAGE_FIELD: &str = "image";

/// Form field selecting the OCR engine
pub const METHOD_FIELD: &str = "ocr_method";

/// Raw fields of a `/procesar-imagen` submission
#[derive(Debug, Clone, Default)]
pub struct ProcessImageForm {
    pub image: Option<Bytes>,
    pub ocr_method: Option<String>,
}

/// A submission with both required fields present
#[derive(Debug, Clone)]
pub struct ValidatedForm {
    pub image: Bytes,
    pub ocr_method: String,
}

impl ProcessImageForm {
    /// Collect the known fields
    ///
    /// `image` must be a file part and `ocr_method` a plain value. The first
    /// occurrence of each wins; repeats and unknown fields are skipped.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().map(str::to_owned);
            let is_file = field.file_name().is_some();

            match name.as_deref() {
                Some(IMAGE_FIELD) if is_file && form.image.is_none() => {
                    form.image = Some(field.bytes().await.map_err(multipart_error)?);
                }
                Some(METHOD_FIELD) if !is_file && form.ocr_method.is_none() => {
                    form.ocr_method = Some(field.text().await.map_err(multipart_error)?);
                }
                other => debug!("Ignoring form field {:?} (file: {})", other, is_file),
            }
        }

        Ok(form)
    }

    /// Require both fields, image first
    pub fn validate(self) -> Result<ValidatedForm, ApiError> {
        let image = self.image.ok_or(ApiError::MissingField(IMAGE_FIELD))?;
        let ocr_method = self.ocr_method.ok_or(ApiError::MissingField(METHOD_FIELD))?;
        Ok(ValidatedForm { image, ocr_method })
    }
}

/// Resolve the method name
///
/// Unrecognized names yield `None` (no recognition), or an error when
/// `strict` is set.
pub fn resolve_method(name: &str, strict: bool) -> Result<Option<OcrMethod>, ApiError> {
    match name.parse::<OcrMethod>() {
        Ok(method) => Ok(Some(method)),
        Err(e) if strict => Err(ApiError::UnsupportedMethod(e.0)),
        Err(e) => {
            debug!("{}; skipping recognition", e);
            Ok(None)
        }
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::InvalidRequest(err.body_text())
    }
}
