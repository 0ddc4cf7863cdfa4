// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end cache behavior over real PLY files.

use std::fs;
use std::path::{Path, PathBuf};

use canopy_cache::{CacheData, CacheError, PlyError, PlyReader, build_with_cache, ply};

fn write_cloud(dir: &Path, name: &str, points: &[[f64; 3]]) -> PathBuf {
    let p = dir.join(name);
    ply::write_points(&p, points, "fixture").unwrap();
    p
}

fn scene(dir: &Path) -> Vec<PathBuf> {
    vec![
        write_cloud(dir, "a.ply", &[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]),
        write_cloud(dir, "b.ply", &[[1.02, 0.0, 0.5], [2.0, 1.0, 1.5], [1.5, 0.5, 1.0]]),
        write_cloud(dir, "c.ply", &[[5.0, 5.0, 0.0], [6.0, 6.0, 1.0]]),
    ]
}

#[test]
fn second_run_is_read_only_and_identical() {
    let dir = tempfile::tempdir().unwrap();
    let files = scene(dir.path());
    let cache_path = dir.path().join("bboxes_cache.bin");

    let first = build_with_cache(dir.path(), &files, 4, &cache_path, &PlyReader).unwrap();
    assert!(first.updated);
    assert_eq!(first.misses, 3);
    let bytes = fs::read(&cache_path).unwrap();

    let second = build_with_cache(dir.path(), &files, 4, &cache_path, &PlyReader).unwrap();
    assert!(!second.updated);
    assert_eq!((second.hits, second.misses), (3, 0));
    assert_eq!(fs::read(&cache_path).unwrap(), bytes);
    for (a, b) in first.boxes.iter().zip(&second.boxes) {
        assert_eq!(a.bounds.to_array().map(f64::to_bits), b.bounds.to_array().map(f64::to_bits));
        assert_eq!((a.id, &a.source), (b.id, &b.source));
    }

    let b = &second.boxes[1].bounds;
    assert_eq!((b.min_x, b.max_x, b.min_z, b.max_z), (1.02, 2.0, 0.5, 1.5));
}

#[test]
fn cache_hits_never_touch_the_reader() {
    let dir = tempfile::tempdir().unwrap();
    let files = scene(dir.path());
    let cache_path = dir.path().join("cache.bin");
    build_with_cache(dir.path(), &files, 2, &cache_path, &PlyReader).unwrap();

    let refuse = |path: &Path, _: u32| -> Result<canopy_index::BBox, PlyError> {
        panic!("reader called for {}", path.display())
    };
    let again = build_with_cache(dir.path(), &files, 2, &cache_path, &refuse).unwrap();
    assert_eq!(again.hits, 3);
}

#[test]
fn edited_file_is_recomputed_and_saved() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = scene(dir.path());
    let cache_path = dir.path().join("cache.bin");
    build_with_cache(dir.path(), &files, 2, &cache_path, &PlyReader).unwrap();

    // Extra point changes the size, so the entry is stale regardless of mtime granularity.
    files[2] = write_cloud(dir.path(), "c.ply", &[[5.0, 5.0, 0.0], [6.0, 6.0, 1.0], [7.0, 5.0, 3.0]]);
    let out = build_with_cache(dir.path(), &files, 2, &cache_path, &PlyReader).unwrap();
    assert_eq!((out.hits, out.misses, out.updated), (2, 1, true));
    assert_eq!(out.boxes[2].bounds.max_x, 7.0);

    let stored = CacheData::load(&cache_path);
    assert_eq!(stored.entries["c.ply"].bounds.max_z, 3.0);
}

#[test]
fn corrupt_cache_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let files = scene(dir.path());
    let cache_path = dir.path().join("cache.bin");
    fs::write(&cache_path, b"not a cache at all").unwrap();

    let out = build_with_cache(dir.path(), &files, 2, &cache_path, &PlyReader).unwrap();
    assert_eq!(out.misses, 3);
    assert_eq!(CacheData::load(&cache_path).len(), 3);
}

#[test]
fn unreadable_cloud_fails_the_build_without_saving() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = scene(dir.path());
    let broken = dir.path().join("broken.ply");
    fs::write(&broken, "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nend_header\n1\n2\n")
        .unwrap();
    files.push(broken);
    let cache_path = dir.path().join("cache.bin");

    let err = build_with_cache(dir.path(), &files, 3, &cache_path, &PlyReader).unwrap_err();
    assert!(
        matches!(err, CacheError::Read(PlyError::MissingVertexFields { .. })),
        "{err:?}"
    );
    assert!(!cache_path.exists());
}
