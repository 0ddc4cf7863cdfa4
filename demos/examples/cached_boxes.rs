// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental bounding boxes.
//!
//! Write a few PLY clouds, compute their boxes through the cache, and show that a second
//! run is served entirely from the cache file.
//!
//! Run:
//! - `cargo run -p canopy_demos --example cached_boxes`

use canopy_cache::{PlyReader, build_with_cache, ply};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut files = Vec::new();
    for i in 0..4 {
        let base = f64::from(i) * 2.0;
        let path = dir.path().join(format!("plot_segmented_{i}.ply"));
        ply::write_points(
            &path,
            &[[base, 0.0, 0.0], [base + 1.0, 1.0, 5.0], [base + 0.5, 0.5, 2.5]],
            "demo",
        )?;
        files.push(path);
    }
    let cache = dir.path().join("bboxes_cache.bin");

    let first = build_with_cache(dir.path(), &files, 4, &cache, &PlyReader)?;
    println!("first run: {} read, cache updated: {}", first.misses, first.updated);

    let second = build_with_cache(dir.path(), &files, 4, &cache, &PlyReader)?;
    println!("second run: {} from cache, cache updated: {}", second.hits, second.updated);
    assert_eq!(first.boxes, second.boxes);
    assert!(!second.updated);

    for b in &second.boxes {
        println!("{:>3} {} height {}", b.id, b.file_name(), b.height());
    }
    Ok(())
}
