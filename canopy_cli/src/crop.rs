// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cropping the background cloud to a target's footprint.
//!
//! Segmentation leaves the unclassified points of a plot in `<stem>_segmented_-1.ply`. For a
//! target `<stem>_segmented_<n>.ply`, the background points inside the target's exact XY
//! footprint (all heights) are written to `crops_minus1/<stem>_segmented_<n>_-1.ply`.

use std::fs;
use std::path::{Path, PathBuf};

use canopy_cache::{PlyError, ply};
use canopy_index::{Aabb3D, BBox};

use crate::normalize::Origin;

/// Directory, inside the input directory, that receives crops.
pub const CROP_DIR: &str = "crops_minus1";

const SEGMENT_KEY: &str = "_segmented_";

/// Name of the background cloud that belongs with `target_file`, if it follows the
/// `<stem>_segmented_<n>.ply` convention.
pub fn background_name(target_file: &str) -> Option<String> {
    let at = target_file.find(SEGMENT_KEY)?;
    Some(format!("{}-1.ply", &target_file[..at + SEGMENT_KEY.len()]))
}

/// Name of the crop written for `target_file`: `.ply` replaced by `_-1.ply`.
pub fn crop_name(target_file: &str) -> String {
    match target_file.rfind(".ply") {
        Some(at) => format!("{}_-1.ply", &target_file[..at]),
        None => format!("{target_file}_-1.ply"),
    }
}

/// Keep the points of `background` whose normalized XY lies inside `footprint`, boundaries
/// included, and write them in raw coordinates to `out`.
///
/// `footprint` is in the frame given by `origin`; Z is not filtered. Returns the number of
/// points kept. Nothing is written when no point is kept.
///
/// # Errors
///
/// Fails if the background cannot be read or the crop cannot be written.
pub fn crop_to_footprint(
    background: &Path,
    footprint: &Aabb3D,
    origin: Origin,
    out: &Path,
) -> Result<usize, PlyError> {
    let mut kept = Vec::new();
    ply::for_each_vertex(background, |x, y, z| {
        let (lx, ly, _) = origin.to_local(x, y, z);
        if footprint.contains_xy(lx, ly) {
            kept.push([x, y, z]);
        }
    })?;
    if kept.is_empty() {
        return Ok(0);
    }
    if let Some(dir) = out.parent() {
        fs::create_dir_all(dir).map_err(|source| PlyError::Write {
            path: out.to_path_buf(),
            source,
        })?;
    }
    ply::write_points(
        out,
        &kept,
        "cropped from -1 by XY (tree bbox), Z unbounded, saved as FLOAT64 ABS",
    )?;
    Ok(kept.len())
}

/// Crop the background cloud in `input_dir` for the normalized `target`.
///
/// Never fails: problems are logged and the crop is skipped. Returns the written file.
pub fn crop_for_target(input_dir: &Path, target: &BBox, origin: Origin) -> Option<PathBuf> {
    let name = target.file_name();
    let Some(background) = background_name(&name).map(|n| input_dir.join(n)) else {
        tracing::warn!(target_file = %name, "target name has no segment number; skipping crop");
        return None;
    };
    if !background.is_file() {
        tracing::warn!(background = %background.display(), "background cloud not found; skipping crop");
        return None;
    }
    let out = input_dir.join(CROP_DIR).join(crop_name(&name));
    match crop_to_footprint(&background, &target.bounds, origin, &out) {
        Ok(0) => {
            tracing::info!(background = %background.display(), "crop is empty; nothing written");
            None
        }
        Ok(points) => {
            tracing::info!(points, out = %out.display(), "wrote background crop");
            Some(out)
        }
        Err(err) => {
            tracing::warn!(error = %err, "background crop failed");
            None
        }
    }
}
