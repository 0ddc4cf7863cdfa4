// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration file and the resolved run settings.
//!
//! Values come from, in order of precedence: command-line flags, the TOML file given with
//! `--config`, and built-in defaults.
//!
//! ```toml
//! [search]
//! gap_xy = 0.04
//! min_overlap_z = 0.04
//! cell_size = 1.0
//! buffer = 1.0
//! threads = 8
//!
//! [cache]
//! enabled = true
//! path = "bboxes_cache.bin"
//!
//! [logging]
//! level = "info"
//! json_format = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use canopy_index::Proximity;
use serde::Deserialize;

use crate::cli::Cli;

/// Default retrieval buffer around a target.
pub const DEFAULT_BUFFER: f64 = 1.0;
/// Default grid cell size.
pub const DEFAULT_CELL_SIZE: f64 = 1.0;
/// Default worker count.
pub const DEFAULT_THREADS: usize = 8;
/// Default cache file.
pub const DEFAULT_CACHE_PATH: &str = "bboxes_cache.bin";
/// Default CSV output of `--all`.
pub const DEFAULT_CSV_PATH: &str = "overlaps.csv";
/// Default log filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Smallest cell size used when the configured one is unusable.
pub const MIN_CELL_SIZE: f64 = 0.01;

/// Contents of a `--config` file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// `[search]` section.
    pub search: SearchSection,
    /// `[cache]` section.
    pub cache: CacheSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// Search tolerances and grid parameters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchSection {
    /// Largest XY gap between near boxes.
    pub gap_xy: Option<f64>,
    /// Smallest Z overlap between near boxes.
    pub min_overlap_z: Option<f64>,
    /// Grid cell size.
    pub cell_size: Option<f64>,
    /// Retrieval buffer around a target.
    pub buffer: Option<f64>,
    /// Worker threads.
    pub threads: Option<usize>,
}

/// Bounding-box cache.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    /// Whether to use the cache at all.
    pub enabled: Option<bool>,
    /// Cache file location.
    pub path: Option<PathBuf>,
}

/// Log output.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Filter directive, e.g. `info` or `canopy_cache=debug`.
    pub level: Option<String>,
    /// Emit JSON lines instead of human-readable text.
    pub json_format: Option<bool>,
}

impl FileConfig {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML, unknown keys, or mistyped values.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// What a run produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// Every near pair, written to a CSV and optionally a text listing.
    AllPairs {
        /// CSV report.
        csv: PathBuf,
        /// Optional text listing.
        txt: Option<PathBuf>,
    },
    /// Neighbors of one target, found by name.
    Target {
        /// File name, or a fragment of the path.
        name: String,
    },
}

/// Resolved log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// JSON output.
    pub json: bool,
}

/// Fully resolved, validated run settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Input directory.
    pub input: PathBuf,
    /// Batch or single-target.
    pub mode: Mode,
    /// Near-pair tolerances, used by both modes.
    pub proximity: Proximity,
    /// Single-target retrieval buffer.
    pub buffer: f64,
    /// Grid cell size, always positive.
    pub cell_size: f64,
    /// Worker threads, at least one.
    pub threads: usize,
    /// Cache file, or `None` to read every cloud.
    pub cache: Option<PathBuf>,
    /// Log output.
    pub logging: LogSettings,
}

fn non_negative(name: &str, value: f64) -> Result<f64> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite, non-negative number (got {value})"
    );
    Ok(value)
}

/// The cell size actually used: unusable values fall back to the buffer, never below
/// [`MIN_CELL_SIZE`].
pub fn effective_cell_size(cell: f64, buffer: f64) -> f64 {
    if cell.is_finite() && cell > 0.0 {
        cell
    } else {
        buffer.max(MIN_CELL_SIZE)
    }
}

impl Settings {
    /// Merge `cli` over `file` over the defaults and validate the result.
    ///
    /// # Errors
    ///
    /// Fails on negative or non-finite tolerances or buffer, and on a single-target run
    /// without `--tree`.
    pub fn resolve(cli: &Cli, file: &FileConfig) -> Result<Self> {
        let search = &file.search;
        let buffer = non_negative(
            "buffer",
            cli.buffer.or(search.buffer).unwrap_or(DEFAULT_BUFFER),
        )?;
        let proximity = Proximity::default();
        let gap_xy = non_negative(
            "gap_xy",
            cli.gap_xy.or(search.gap_xy).unwrap_or(proximity.max_gap_xy),
        )?;
        let min_overlap_z = non_negative(
            "min_overlap_z",
            cli.min_overlap_z
                .or(search.min_overlap_z)
                .unwrap_or(proximity.min_overlap_z),
        )?;
        let cell = cli.cell.or(search.cell_size).unwrap_or(DEFAULT_CELL_SIZE);
        let threads = cli.threads.or(search.threads).unwrap_or(DEFAULT_THREADS).max(1);

        let mode = if cli.all {
            Mode::AllPairs {
                csv: cli
                    .out
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_PATH)),
                txt: cli.out_txt.clone(),
            }
        } else {
            match cli.tree.as_deref() {
                Some(name) if !name.is_empty() => Mode::Target {
                    name: name.to_owned(),
                },
                _ => bail!("--tree <FILE> is required unless --all is given"),
            }
        };

        let cache_enabled = !cli.no_cache && file.cache.enabled.unwrap_or(true);
        let cache = cache_enabled.then(|| {
            cli.cache
                .clone()
                .or_else(|| file.cache.path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH))
        });

        let logging = LogSettings {
            level: cli
                .log_level
                .clone()
                .or_else(|| file.logging.level.clone())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned()),
            json: cli.json_logs || file.logging.json_format.unwrap_or(false),
        };

        Ok(Self {
            input: cli.input.clone(),
            mode,
            proximity: Proximity::new(gap_xy, min_overlap_z),
            buffer,
            cell_size: effective_cell_size(cell, buffer),
            threads,
            cache,
            logging,
        })
    }
}
