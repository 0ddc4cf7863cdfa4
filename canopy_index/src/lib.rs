// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Index: 3D bounding boxes, proximity predicates, and a uniform XY grid.
//!
//! Canopy Index is the geometric core for finding objects (trees, shrubs, poles) whose
//! bounding boxes sit close together in the horizontal plane while overlapping in height.
//!
//! - [`Aabb3D`] and [`BBox`]: immutable boxes tagged with a stable id and a source file.
//! - [`near_3d`] / [`Proximity`]: "close in XY, genuinely overlapping in Z".
//! - [`GridIndex`]: a uniform spatial hash over box footprints with stamp-based duplicate
//!   suppression, so repeated queries never clear or reallocate a visited set.
//! - [`find_all_overlaps`]: a parallel, deduplicated all-pairs search over grid cells.
//! - [`neighbors_of`]: the single-target lookup with a retrieval buffer.
//!
//! # Example
//!
//! ```rust
//! use canopy_index::{Aabb3D, BBox, GridIndex, Proximity, find_all_overlaps, neighbors_of};
//!
//! let boxes = vec![
//!     BBox::new(0, Aabb3D::new(0.0, 1.0, 0.0, 1.0, 0.0, 1.0), "a.ply"),
//!     BBox::new(1, Aabb3D::new(1.02, 2.0, 0.0, 1.0, 0.5, 1.5), "b.ply"),
//!     BBox::new(2, Aabb3D::new(5.0, 6.0, 5.0, 6.0, 0.0, 1.0), "c.ply"),
//! ];
//!
//! let mut grid = GridIndex::new(1.0);
//! grid.build(&boxes);
//!
//! let near = Proximity::new(0.04, 0.04);
//! let pairs = find_all_overlaps(&boxes, &grid, 4, near);
//! assert_eq!(pairs.len(), 1);
//! assert_eq!((pairs[0].a, pairs[0].b), (0, 1));
//!
//! let hits = neighbors_of(&mut grid, &boxes, 0, near, 1.0);
//! assert_eq!(hits.ids, vec![1]);
//! ```
//!
//! ## Choosing a cell size
//!
//! The all-pairs search compares every pair inside a cell, so cost grows with the square of
//! cell occupancy. Pick a cell size commensurate with typical object size: too small and
//! large boxes are replicated into many cells, too large and crowded cells dominate.
//!
//! ### Float semantics
//!
//! Coordinates are assumed to be finite. Debug builds assert that query boxes are not inverted.

pub mod grid;
pub mod pairs;
pub mod query;
pub mod types;

pub use grid::{CellKey, GridIndex};
pub use pairs::{OverlapPair, find_all_overlaps, pair_key};
pub use query::{Neighbors, neighbors_of};
pub use types::{
    Aabb3D, BBox, BoxId, Proximity, expand_xy, gap_1d, near_3d, overlap_1d, overlaps_3d,
    overlaps_xy,
};
