// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grid query basics.
//!
//! Index a handful of boxes, fetch candidates around one of them, and filter the
//! candidates down to true neighbors.
//!
//! Run:
//! - `cargo run -p canopy_demos --example grid_query_basics`

use canopy_index::{Aabb3D, BBox, GridIndex, Proximity, expand_xy, neighbors_of};

fn main() {
    let boxes = vec![
        BBox::new(0, Aabb3D::new(0.0, 1.0, 0.0, 1.0, 0.0, 8.0), "oak.ply"),
        // 2 cm east of the oak, overlapping it in height.
        BBox::new(1, Aabb3D::new(1.02, 2.0, 0.0, 1.0, 3.0, 9.0), "birch.ply"),
        // Close in XY, but a low shrub entirely below the oak's crown base.
        BBox::new(2, Aabb3D::new(0.0, 1.0, 1.01, 1.5, -2.0, -0.5), "shrub.ply"),
        BBox::new(3, Aabb3D::new(8.0, 9.0, 8.0, 9.0, 0.0, 6.0), "pine.ply"),
    ];

    let mut grid = GridIndex::new(1.0);
    grid.build(&boxes);
    println!("{} boxes in {} cells", grid.len(), grid.occupied_cells());

    // Candidates come from cells only; they are not yet tested for nearness.
    let around_oak = grid.query_candidates(&expand_xy(&boxes[0].bounds, 0.5));
    println!("candidates around the oak: {around_oak:?}");
    assert!(around_oak.contains(&2), "the shrub shares cells with the oak");

    // Repeated queries reuse the visited marks without clearing them.
    for _ in 0..3 {
        assert_eq!(grid.query_candidates(&expand_xy(&boxes[0].bounds, 0.5)), around_oak);
    }

    let hits = neighbors_of(&mut grid, &boxes, 0, Proximity::default(), 0.5);
    println!(
        "search buffer {}: {} candidates, neighbors {:?}",
        hits.search_buffer, hits.candidates, hits.ids
    );
    assert_eq!(hits.ids, vec![1], "only the birch is near in XY and overlaps in Z");
}
