// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Neighbor lookup around a single target box.

use crate::grid::GridIndex;
use crate::types::{BBox, BoxId, Proximity, expand_xy};

/// Result of [`neighbors_of`].
#[derive(Clone, Debug, PartialEq)]
pub struct Neighbors {
    /// Buffer actually used to widen the target for retrieval.
    pub search_buffer: f64,
    /// Number of ids the grid returned, the target included.
    pub candidates: usize,
    /// Accepted neighbors, in discovery order.
    pub ids: Vec<BoxId>,
}

/// Boxes near `target` under `proximity`.
///
/// The target is widened in XY by `max(buffer, proximity.max_gap_xy)` to fetch candidates,
/// so the buffer never undercuts the gap tolerance. Candidates are then tested against the
/// unwidened target and the target itself is excluded.
///
/// # Panics
///
/// Panics if `target` is not a valid position in `boxes`.
pub fn neighbors_of(
    index: &mut GridIndex,
    boxes: &[BBox],
    target: BoxId,
    proximity: Proximity,
    buffer: f64,
) -> Neighbors {
    let exact = &boxes[target as usize].bounds;
    let search_buffer = buffer.max(proximity.max_gap_xy);
    let candidates = index.query_candidates(&expand_xy(exact, search_buffer));
    let ids = candidates
        .iter()
        .copied()
        .filter(|&id| id != target && proximity.accepts(exact, &boxes[id as usize].bounds))
        .collect();
    Neighbors {
        search_buffer,
        candidates: candidates.len(),
        ids,
    }
}
