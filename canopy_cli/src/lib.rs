// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The `canopy` command: proximity search over a directory of segmented point clouds.
//!
//! Each `.ply` file in the input directory holds one object. The command computes a
//! bounding box per file (reusing a cache between runs), shifts the boxes to a
//! dataset-local frame, indexes their footprints on a uniform grid, and then either:
//!
//! - lists every pair of objects that are near in XY and overlap in Z (`--all`), written
//!   as CSV and optionally plain text, or
//! - lists the neighbors of one target object (`--tree NAME`) and crops the plot's
//!   background cloud to the target's footprint.
//!
//! Results go to stdout, diagnostics to stderr through `tracing`.

pub mod app;
pub mod cli;
pub mod config;
pub mod crop;
pub mod discover;
pub mod logging;
pub mod normalize;
pub mod report;

pub use app::run;
pub use cli::Cli;
pub use config::{FileConfig, Settings};
