// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform XY grid over box footprints.
//!
//! Each box id is appended to every cell its footprint touches, so a box that straddles
//! cell boundaries is replicated into each of them. The grid is a candidate generator, not
//! a partition: callers filter candidates with an exact predicate afterwards.

use core::fmt::Debug;

use kurbo::Rect;
use rustc_hash::FxHashMap;

use crate::types::{Aabb3D, BBox, BoxId};

/// Integer coordinates of a grid cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    /// Column, `floor(x / cell_size)`.
    pub gx: i64,
    /// Row, `floor(y / cell_size)`.
    pub gy: i64,
}

/// Inclusive range of cells covered by a footprint.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct CellSpan {
    min: CellKey,
    max: CellKey,
}

impl CellSpan {
    fn keys(self) -> impl Iterator<Item = CellKey> {
        (self.min.gx..=self.max.gx)
            .flat_map(move |gx| (self.min.gy..=self.max.gy).map(move |gy| CellKey { gx, gy }))
    }
}

/// Uniform grid index with per-query duplicate suppression.
///
/// Queries mark each emitted id with the query's stamp in a per-box array instead of
/// building a fresh set, so a query costs time proportional to the candidates it touches.
/// The stamp array is sized once per [`build`](Self::build) and never cleared between
/// queries; it is only reset when the stamp counter wraps.
pub struct GridIndex {
    cell_size: f64,
    cells: FxHashMap<CellKey, Vec<BoxId>>,
    visited: Vec<u32>,
    stamp: u32,
    boxes: usize,
}

impl GridIndex {
    /// Create an empty grid with square cells of side `cell_size`.
    ///
    /// # Panics
    ///
    /// Panics if `cell_size` is not a positive finite number.
    pub fn new(cell_size: f64) -> Self {
        assert!(
            cell_size > 0.0 && cell_size.is_finite(),
            "cell size must be positive and finite"
        );
        Self {
            cell_size,
            cells: FxHashMap::default(),
            visited: Vec::new(),
            stamp: 1,
            boxes: 0,
        }
    }

    /// Side length of a cell.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of boxes indexed by the last build.
    pub fn len(&self) -> usize {
        self.boxes
    }

    /// Whether the last build indexed no boxes.
    pub fn is_empty(&self) -> bool {
        self.boxes == 0
    }

    /// Number of cells holding at least one box.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn coord(&self, v: f64) -> i64 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Cell coordinates saturate for out-of-range inputs; finite inputs are assumed."
        )]
        let c = (v / self.cell_size).floor() as i64;
        c
    }

    /// Cell containing the point.
    pub fn key_for(&self, x: f64, y: f64) -> CellKey {
        CellKey {
            gx: self.coord(x),
            gy: self.coord(y),
        }
    }

    fn span_for(&self, footprint: Rect) -> CellSpan {
        CellSpan {
            min: self.key_for(footprint.x0, footprint.y0),
            max: self.key_for(footprint.x1, footprint.y1),
        }
    }

    /// Rebuild the grid from scratch over `boxes`.
    ///
    /// Every box id is appended to each cell its footprint covers. The stamp array is
    /// re-sized to the boxes and zeroed, and the stamp counter restarts at 1.
    ///
    /// Each box's id must equal its position in `boxes`; debug builds assert this.
    pub fn build(&mut self, boxes: &[BBox]) {
        debug_assert!(
            ids_match_positions(boxes),
            "box ids must equal their positions in the slice"
        );
        self.cells.clear();
        self.cells.reserve(boxes.len() * 2);

        for b in boxes {
            let span = self.span_for(b.bounds.footprint());
            for key in span.keys() {
                self.cells.entry(key).or_default().push(b.id);
            }
        }

        let slots = boxes
            .iter()
            .map(|b| b.id as usize + 1)
            .max()
            .unwrap_or(0)
            .max(boxes.len());
        self.visited.clear();
        self.visited.resize(slots, 0);
        self.stamp = 1;
        self.boxes = boxes.len();
    }

    fn next_stamp(&mut self) -> u32 {
        if self.stamp == 0 {
            // Counter wrapped: forget every previous mark.
            self.visited.fill(0);
            self.stamp = 1;
        }
        let s = self.stamp;
        self.stamp = self.stamp.wrapping_add(1);
        s
    }

    /// Ids of every box sharing a cell with the query's footprint, each reported once.
    ///
    /// Ids come out in discovery order. Cells without boxes contribute nothing.
    pub fn query_candidates(&mut self, query: &Aabb3D) -> Vec<BoxId> {
        let mut out = Vec::with_capacity(128);
        self.query_candidates_into(query, &mut out);
        out
    }

    /// Like [`query_candidates`](Self::query_candidates) but appends to `out`.
    pub fn query_candidates_into(&mut self, query: &Aabb3D, out: &mut Vec<BoxId>) {
        debug_assert!(!query.is_inverted(), "query box must not be inverted");
        let span = self.span_for(query.footprint());
        let stamp = self.next_stamp();
        for key in span.keys() {
            let Some(ids) = self.cells.get(&key) else {
                continue;
            };
            for &id in ids {
                let mark = &mut self.visited[id as usize];
                if *mark != stamp {
                    *mark = stamp;
                    out.push(id);
                }
            }
        }
    }

    /// Ids stored in one cell, if it is occupied.
    pub fn cell(&self, key: CellKey) -> Option<&[BoxId]> {
        self.cells.get(&key).map(Vec::as_slice)
    }

    /// Occupied cells and their ids, in no particular order.
    pub fn cells(&self) -> impl Iterator<Item = (CellKey, &[BoxId])> + '_ {
        self.cells.iter().map(|(k, ids)| (*k, ids.as_slice()))
    }

    #[cfg(test)]
    fn set_stamp(&mut self, stamp: u32) {
        self.stamp = stamp;
    }
}

/// Whether `boxes[i].id == i` for every box.
pub(crate) fn ids_match_positions(boxes: &[BBox]) -> bool {
    boxes
        .iter()
        .enumerate()
        .all(|(i, b)| usize::try_from(b.id).is_ok_and(|id| id == i))
}

impl Debug for GridIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let replicas: usize = self.cells.values().map(Vec::len).sum();
        f.debug_struct("GridIndex")
            .field("cell_size", &self.cell_size)
            .field("boxes", &self.boxes)
            .field("cells", &self.cells.len())
            .field("replicas", &replicas)
            .field("stamp", &self.stamp)
            .finish_non_exhaustive()
    }
}
