// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR engine registry: loads both engines once and dispatches requests to them

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::vision::ocr::{EasyOcrEngine, KerasOcrEngine, OcrEngine, OcrMethod, RecognitionResult};

/// Configuration for loading OCR models
#[derive(Debug, Clone)]
pub struct OcrModelConfig {
    /// Directory with the keras engine models (optional)
    pub keras_model_dir: Option<String>,
    /// Directory with the easyocr engine models (optional)
    pub easyocr_model_dir: Option<String>,
}

impl Default for OcrModelConfig {
    fn default() -> Self {
        Self {
            keras_model_dir: Some("./models/keras-ocr-onnx".to_string()),
            easyocr_model_dir: Some("./models/easyocr-onnx".to_string()),
        }
    }
}

/// Availability of one engine, as reported by `/health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineInfo {
    pub name: String,
    pub available: bool,
}

/// Why a recognition request could not produce a result
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("OCR engine '{0}' not available")]
    Unavailable(OcrMethod),

    #[error("OCR processing failed: {0:#}")]
    Failed(anyhow::Error),
}

/// Both OCR engines, constructed once at startup and shared read-only
///
/// Handlers receive this through application state; tests build it from
/// fakes with [`OcrEngines::new`].
#[derive(Clone, Default)]
pub struct OcrEngines {
    keras: Option<Arc<dyn OcrEngine>>,
    easyocr: Option<Arc<dyn OcrEngine>>,
}

impl std::fmt::Debug for OcrEngines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrEngines")
            .field("keras", &self.keras.is_some())
            .field("easyocr", &self.easyocr.is_some())
            .finish()
    }
}

impl OcrEngines {
    pub fn new(keras: Option<Arc<dyn OcrEngine>>, easyocr: Option<Arc<dyn OcrEngine>>) -> Self {
        Self { keras, easyocr }
    }

    /// Load both engines from the configured directories
    ///
    /// Model loading is blocking work; it runs on the blocking pool. A missing
    /// or broken model directory leaves that engine unavailable.
    pub async fn load(config: OcrModelConfig) -> anyhow::Result<Self> {
        let engines = tokio::task::spawn_blocking(move || {
            let keras = config.keras_model_dir.as_deref().and_then(|dir| {
                match KerasOcrEngine::load(dir) {
                    Ok(engine) => {
                        tracing::info!("✅ {} OCR engine loaded from {}", engine.method(), dir);
                        Some(Arc::new(engine) as Arc<dyn OcrEngine>)
                    }
                    Err(e) => {
                        tracing::warn!("⚠️ Failed to load keras OCR engine from {}: {:#}", dir, e);
                        None
                    }
                }
            });

            let easyocr = config.easyocr_model_dir.as_deref().and_then(|dir| {
                match EasyOcrEngine::load(dir) {
                    Ok(engine) => {
                        tracing::info!("✅ {} OCR engine loaded from {}", engine.method(), dir);
                        Some(Arc::new(engine) as Arc<dyn OcrEngine>)
                    }
                    Err(e) => {
                        tracing::warn!("⚠️ Failed to load easyocr engine from {}: {:#}", dir, e);
                        None
                    }
                }
            });

            Self::new(keras, easyocr)
        })
        .await?;

        Ok(engines)
    }

    /// Get the engine for a method if it is loaded
    pub fn get(&self, method: OcrMethod) -> Option<Arc<dyn OcrEngine>> {
        match method {
            OcrMethod::Keras => self.keras.clone(),
            OcrMethod::EasyOcr => self.easyocr.clone(),
        }
    }

    pub fn has(&self, method: OcrMethod) -> bool {
        self.get(method).is_some()
    }

    /// Run the selected engine on an image
    ///
    /// `None` stands for an unrecognized method and yields an empty result.
    pub fn recognize(
        &self,
        method: Option<OcrMethod>,
        image: &DynamicImage,
    ) -> Result<RecognitionResult, EngineError> {
        let Some(method) = method else {
            return Ok(RecognitionResult::empty());
        };

        let engine = self.get(method).ok_or(EngineError::Unavailable(method))?;
        engine.recognize(image).map_err(EngineError::Failed)
    }

    /// List both engines with their availability
    pub fn list_engines(&self) -> Vec<EngineInfo> {
        OcrMethod::ALL
            .iter()
            .map(|method| EngineInfo {
                name: method.to_string(),
                available: self.has(*method),
            })
            .collect()
    }
}
