// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Cache: per-file bounding boxes that survive between runs.
//!
//! Computing a box means streaming every vertex of a point cloud, which dominates the
//! runtime of a proximity search over thousands of files. This crate keeps the result
//! keyed by `(relative path, size, modification time)` in a small binary file, and only
//! recomputes files whose identity changed.
//!
//! - [`CacheData`]: the in-memory cache; [`CacheData::load`] never fails, [`CacheData::save`] does.
//! - [`build_with_cache`] / [`refresh`]: reuse fresh entries, recompute the rest in parallel.
//! - [`read_all_parallel`]: the same worker pool without a cache.
//! - [`ply`]: the PLY reader behind [`PlyReader`], plus point I/O used for crops.
//!
//! A single failing file aborts the batch. A missing, truncated or foreign cache file is
//! not an error; it just loads empty.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//! use canopy_cache::{PlyReader, build_with_cache};
//!
//! let root = Path::new("plots/north");
//! let files: Vec<PathBuf> = vec![root.join("tree_1.ply"), root.join("tree_2.ply")];
//! let outcome = build_with_cache(root, &files, 8, Path::new("bboxes_cache.bin"), &PlyReader)?;
//! println!("{} boxes, {} from cache", outcome.boxes.len(), outcome.hits);
//! # Ok::<(), canopy_cache::CacheError>(())
//! ```
//!
//! The modification token is only meaningful on the machine that wrote it. Copying a
//! cache between machines is safe but will usually just miss.

mod build;
mod entry;
mod error;
mod format;
mod pool;

pub mod ply;

pub use build::{BuildOutcome, build_with_cache, read_all_parallel, refresh};
pub use entry::{CACHE_VERSION, CacheData, CacheEntry, FileStamp, relative_key};
pub use error::{CacheError, PlyError};
pub use format::MAGIC;
pub use ply::{GeometryReader, PlyReader, VertexFields};
