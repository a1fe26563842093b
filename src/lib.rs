// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod storage;
pub mod version;
pub mod vision;

// Re-export main types
pub use api::{create_router, start_server, AppState};
pub use config::ServiceConfig;
pub use storage::OutputStore;
pub use vision::{Annotator, OcrEngine, OcrEngines, OcrMethod, RecognitionResult};
