// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod output_store;
pub mod sweeper;

// Re-export main types for convenience
pub use output_store::{OutputStore, StoreError, OUTPUT_EXTENSION};
pub use sweeper::{spawn_sweeper, sweep_once};
