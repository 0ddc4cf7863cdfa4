// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Finding input clouds and the target among them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use canopy_index::{BBox, BoxId};

/// Marker in the file name of a background (unsegmented) cloud.
pub const BACKGROUND_MARKER: &str = "_segmented_-1.ply";

/// Whether `name` is a per-object cloud: a `.ply` that is not a background cloud.
fn is_object_cloud(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    path.extension().is_some_and(|e| e == "ply") && !name.contains(BACKGROUND_MARKER)
}

/// The `.ply` files directly inside `dir`, background clouds excluded, sorted by path.
///
/// Sorting makes box ids stable across runs over the same directory.
///
/// # Errors
///
/// Fails if the directory cannot be listed or contains no object clouds.
pub fn list_ply_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list {}", dir.display()))?
            .path();
        if path.is_file() && is_object_cloud(&path) {
            files.push(path);
        }
    }
    ensure!(!files.is_empty(), "no .ply files found in {}", dir.display());
    files.sort();
    tracing::debug!(dir = %dir.display(), files = files.len(), "discovered point clouds");
    Ok(files)
}

/// Locate the target box by name.
///
/// An exact file-name match wins; otherwise the first box whose full source path contains
/// `name` is returned.
pub fn find_target(boxes: &[BBox], name: &str) -> Option<BoxId> {
    let wanted = Path::new(name).file_name();
    boxes
        .iter()
        .find(|b| wanted.is_some() && b.source.file_name() == wanted)
        .or_else(|| {
            boxes
                .iter()
                .find(|b| b.source.to_string_lossy().contains(name))
        })
        .map(|b| b.id)
}
