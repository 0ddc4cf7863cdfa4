// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command-line arguments.
//!
//! Every tunable is optional here so that a value from `--config` can fill the gap;
//! defaults are applied in [`crate::config::Settings::resolve`].

use std::path::PathBuf;

use clap::Parser;

/// Find point-cloud objects that sit close together in XY while overlapping in height.
#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(name = "canopy", version, about)]
pub struct Cli {
    /// Directory holding one PLY file per segmented object
    #[arg(long, value_name = "DIR")]
    pub input: PathBuf,

    /// Target file name (or part of its path) for the single-target query
    #[arg(long, value_name = "FILE")]
    pub tree: Option<String>,

    /// XY margin used to fetch candidates around the target [default: 1.0]
    #[arg(long, allow_negative_numbers = true)]
    pub buffer: Option<f64>,

    /// Grid cell size; non-positive values fall back to max(0.01, buffer) [default: 1.0]
    #[arg(long, allow_negative_numbers = true)]
    pub cell: Option<f64>,

    /// Worker threads; 0 means 1 [default: 8]
    #[arg(long)]
    pub threads: Option<usize>,

    /// Bounding-box cache file [default: bboxes_cache.bin]
    #[arg(long, value_name = "FILE")]
    pub cache: Option<PathBuf>,

    /// Read every cloud instead of using the cache
    #[arg(long)]
    pub no_cache: bool,

    /// Largest XY gap between two boxes that still counts as near, in both modes
    /// including --all [default: 0.04]
    #[arg(long, allow_negative_numbers = true)]
    pub gap_xy: Option<f64>,

    /// Smallest Z overlap two boxes need to count as near, in both modes including --all
    /// [default: 0.04]
    #[arg(long, allow_negative_numbers = true)]
    pub min_overlap_z: Option<f64>,

    /// Report every near pair in the input instead of a single target's neighbors
    #[arg(long)]
    pub all: bool,

    /// CSV output for --all [default: overlaps.csv]
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Optional plain-text pair listing for --all
    #[arg(long, value_name = "FILE")]
    pub out_txt: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level or filter directive (trace, debug, info, warn, error) [default: info]
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}
