// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::storage::StoreError;
use crate::vision::{EngineError, ImageError};

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid multipart request: {0}")]
    InvalidRequest(String),

    #[error("Upload exceeds the maximum request size")]
    PayloadTooLarge,

    #[error("Invalid image: {0}")]
    InvalidImage(#[from] ImageError),

    #[error("Unsupported ocr_method '{0}', expected 'keras' or 'easyocr'")]
    UnsupportedMethod(String),

    #[error("File not found")]
    NotFound,

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingField(_)
            | ApiError::InvalidRequest(_)
            | ApiError::InvalidImage(_)
            | ApiError::UnsupportedMethod(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unavailable(_) => ApiError::ServiceUnavailable(err.to_string()),
            EngineError::Failed(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Io(e) => ApiError::InternalError(format!("Failed to store output: {}", e)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!("Request failed ({}): {}", status.as_u16(), self);
        }
        (status, Json(self.to_response())).into_response()
    }
}
