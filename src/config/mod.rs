// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration loaded from environment variables

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::vision::OcrModelConfig;

/// Runtime configuration for the OCR image service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Bind host (all interfaces by default)
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Directory holding transient annotated images
    pub output_dir: PathBuf,
    /// Base URL used when building `image_url` (Host header when unset)
    pub public_base_url: Option<String>,
    /// Delay between serving a file and deleting it
    pub download_delete_delay_ms: u64,
    /// Age after which never-downloaded files are swept
    pub output_ttl_secs: u64,
    /// How often the sweeper runs
    pub sweep_interval_secs: u64,
    /// Maximum accepted request body size
    pub max_upload_bytes: usize,
    /// Reject unknown `ocr_method` values instead of returning empty text
    pub strict_ocr_method: bool,
    /// Output JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// TrueType font overriding the bundled DejaVu Sans for annotation labels
    pub annotation_font_path: Option<PathBuf>,
    /// OCR model locations
    pub models: OcrModelConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            output_dir: PathBuf::from("processed_images"),
            public_base_url: None,
            download_delete_delay_ms: 1000,
            output_ttl_secs: 3600,
            sweep_interval_secs: 300,
            max_upload_bytes: 20 * 1024 * 1024,
            strict_ocr_method: false,
            jpeg_quality: 90,
            annotation_font_path: None,
            models: OcrModelConfig::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("API_HOST").unwrap_or(defaults.host),
            port: parse_env("API_PORT", defaults.port),
            output_dir: env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .ok()
                .map(|v| v.trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
            download_delete_delay_ms: parse_env(
                "DOWNLOAD_DELETE_DELAY_MS",
                defaults.download_delete_delay_ms,
            ),
            output_ttl_secs: parse_env("OUTPUT_TTL_SECS", defaults.output_ttl_secs),
            sweep_interval_secs: parse_env("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            strict_ocr_method: parse_flag("STRICT_OCR_METHOD"),
            jpeg_quality: parse_env("JPEG_QUALITY", defaults.jpeg_quality),
            annotation_font_path: env::var("ANNOTATION_FONT_PATH").ok().map(PathBuf::from),
            models: OcrModelConfig {
                keras_model_dir: env::var("KERAS_OCR_MODEL_DIR")
                    .ok()
                    .or(defaults.models.keras_model_dir),
                easyocr_model_dir: env::var("EASYOCR_MODEL_DIR")
                    .ok()
                    .or(defaults.models.easyocr_model_dir),
            },
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.output_ttl_secs == 0 {
            return Err("OUTPUT_TTL_SECS must be greater than 0".to_string());
        }
        if self.sweep_interval_secs == 0 {
            return Err("SWEEP_INTERVAL_SECS must be greater than 0".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("MAX_UPLOAD_BYTES must be greater than 0".to_string());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "JPEG_QUALITY must be between 1 and 100, got {}",
                self.jpeg_quality
            ));
        }
        if let Some(ref base) = self.public_base_url {
            if !base.starts_with("http://") && !base.starts_with("https://") {
                return Err(format!("PUBLIC_BASE_URL must be an http(s) URL, got {}", base));
            }
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }

    pub fn delete_delay(&self) -> Duration {
        Duration::from_millis(self.download_delete_delay_ms)
    }

    pub fn output_ttl(&self) -> Duration {
        Duration::from_secs(self.output_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
