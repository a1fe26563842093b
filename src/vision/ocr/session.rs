// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared ONNX Runtime session setup for OCR models

use anyhow::{Context, Result};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Threads used inside a single inference call
const INTRA_THREADS: usize = 4;

/// Load an ONNX model with CPU-only execution
pub fn load_cpu_session(model_path: &Path, what: &str) -> Result<Session> {
    if !model_path.exists() {
        anyhow::bail!("{} not found: {}", what, model_path.display());
    }

    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(INTRA_THREADS)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load {} from {}", what, model_path.display()))
}

/// First input and output names, with fallbacks for models exported without them
pub fn io_names(session: &Session, default_input: &str, default_output: &str) -> (String, String) {
    let input_name = session
        .inputs
        .first()
        .map(|input| input.name.clone())
        .unwrap_or_else(|| default_input.to_string());

    let output_name = session
        .outputs
        .first()
        .map(|output| output.name.clone())
        .unwrap_or_else(|| default_output.to_string());

    (input_name, output_name)
}

/// Lock a session, turning mutex poisoning into an error
pub fn lock_session<'a>(session: &'a Mutex<Session>, what: &str) -> Result<MutexGuard<'a, Session>> {
    session
        .lock()
        .map_err(|_| anyhow::anyhow!("{} session lock poisoned", what))
}
