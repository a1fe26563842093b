// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Provides GET /download/:filename for fetching annotated images once.

pub mod handler;

pub use handler::download_handler;
