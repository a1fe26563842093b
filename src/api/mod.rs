// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod download;
pub mod errors;
pub mod http_server;
pub mod process_image;

pub use download::download_handler;
pub use errors::{ApiError, ErrorResponse};
pub use http_server::{create_router, start_server, AppState, HealthResponse};
pub use process_image::{process_image_handler, ProcessImageForm, ProcessImageResponse};
