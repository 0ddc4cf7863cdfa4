// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! All-pairs search.
//!
//! Lay out a row of trees where every other gap is within tolerance, then find every
//! near pair with different worker counts.
//!
//! Run:
//! - `cargo run -p canopy_demos --example overlap_pairs`

use canopy_index::{Aabb3D, BBox, GridIndex, Proximity, find_all_overlaps};

fn main() {
    // Trees 1 m wide; gaps alternate between 3 cm and 20 cm.
    let mut x = 0.0;
    let mut boxes = Vec::new();
    for id in 0..10_u32 {
        boxes.push(BBox::new(
            id,
            Aabb3D::new(x, x + 1.0, 0.0, 1.0, 0.0, 10.0),
            format!("row_segmented_{id}.ply"),
        ));
        x += if id % 2 == 0 { 1.03 } else { 1.2 };
    }

    let mut grid = GridIndex::new(2.0);
    grid.build(&boxes);
    let near = Proximity::new(0.04, 0.04);

    let mut reference = find_all_overlaps(&boxes, &grid, 1, near);
    reference.sort_unstable();
    for p in &reference {
        println!("{} <-> {}", boxes[p.a as usize].file_name(), boxes[p.b as usize].file_name());
    }

    for threads in [2, 4, 8] {
        let mut pairs = find_all_overlaps(&boxes, &grid, threads, near);
        pairs.sort_unstable();
        assert_eq!(pairs, reference, "the pair set does not depend on the worker count");
    }

    // Tighter Z requirement than any overlap present: nothing qualifies.
    let strict = Proximity::new(0.04, 20.0);
    assert!(find_all_overlaps(&boxes, &grid, 4, strict).is_empty());
}
