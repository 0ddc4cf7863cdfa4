// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parallel all-pairs proximity search over the occupied cells of a [`GridIndex`].
//!
//! Occupied cells are the unit of work. Workers claim cells from a shared atomic counter,
//! compare every pair of ids inside a claimed cell, and collect accepted pairs into a
//! worker-local deduplicated list. Each worker merges its list into the global result once,
//! under a single mutex, after it runs out of cells.
//!
//! Only boxes that share at least one cell are compared. Two boxes whose footprints lie in
//! different cells with a boundary between them are never reported, even when their gap is
//! within tolerance; pick the cell size with that in mind.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use rustc_hash::FxHashSet;

use crate::grid::{GridIndex, ids_match_positions};
use crate::types::{BBox, BoxId, Proximity};

/// Key encoding an unordered pair: `(min << 32) | max`.
///
/// `pair_key(a, b) == pair_key(b, a)` for all ids.
#[inline]
pub fn pair_key(i: BoxId, j: BoxId) -> u64 {
    let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
    (u64::from(lo) << 32) | u64::from(hi)
}

/// An unordered pair of distinct boxes, stored with `a < b`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlapPair {
    /// Smaller id.
    pub a: BoxId,
    /// Larger id.
    pub b: BoxId,
}

impl OverlapPair {
    /// Canonical pair for two distinct ids, in either order.
    pub fn new(i: BoxId, j: BoxId) -> Self {
        debug_assert_ne!(i, j, "a pair needs two distinct boxes");
        Self {
            a: i.min(j),
            b: i.max(j),
        }
    }

    /// Deduplication key, see [`pair_key`].
    #[inline]
    pub fn key(self) -> u64 {
        pair_key(self.a, self.b)
    }
}

#[derive(Default)]
struct Merged {
    seen: FxHashSet<u64>,
    pairs: Vec<OverlapPair>,
}

/// Every unordered pair of boxes sharing a grid cell that satisfies `proximity`.
///
/// `index` must have been built over `boxes`, with each box's id equal to its position.
/// The pool has `min(threads, occupied cells)` workers, at least one. The result holds each
/// pair once; its order is unspecified, but the set does not depend on `threads`.
pub fn find_all_overlaps(
    boxes: &[BBox],
    index: &GridIndex,
    threads: usize,
    proximity: Proximity,
) -> Vec<OverlapPair> {
    debug_assert!(
        index.len() == boxes.len() && ids_match_positions(boxes),
        "box ids must equal their positions in the slice the index was built over"
    );
    let start = Instant::now();
    let cells: Vec<&[BoxId]> = index.cells().map(|(_, ids)| ids).collect();
    if cells.is_empty() {
        return Vec::new();
    }

    let workers = threads.min(cells.len()).max(1);
    let next = AtomicUsize::new(0);
    let merged = Mutex::new(Merged::default());

    thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| {
                let mut seen = FxHashSet::default();
                let mut local = Vec::new();
                loop {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    let Some(ids) = cells.get(idx) else {
                        break;
                    };
                    scan_cell(boxes, ids, proximity, &mut seen, &mut local);
                }

                let mut global = merged.lock().unwrap_or_else(PoisonError::into_inner);
                let global = &mut *global;
                for pair in local {
                    if global.seen.insert(pair.key()) {
                        global.pairs.push(pair);
                    }
                }
            });
        }
    });

    let pairs = merged
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .pairs;
    tracing::debug!(
        cells = cells.len(),
        workers,
        pairs = pairs.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "overlap search finished"
    );
    pairs
}

/// Compare all pairs inside one cell, recording new accepted pairs.
fn scan_cell(
    boxes: &[BBox],
    ids: &[BoxId],
    proximity: Proximity,
    seen: &mut FxHashSet<u64>,
    out: &mut Vec<OverlapPair>,
) {
    if ids.len() < 2 {
        return;
    }
    for (n, &ia) in ids.iter().enumerate() {
        let a = &boxes[ia as usize].bounds;
        for &ib in &ids[n + 1..] {
            if ia == ib {
                continue;
            }
            if !proximity.accepts(a, &boxes[ib as usize].bounds) {
                continue;
            }
            let pair = OverlapPair::new(ia, ib);
            if seen.insert(pair.key()) {
                out.push(pair);
            }
        }
    }
}
