// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The run workflow: discover, box, normalize, index, then search.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use canopy_cache::{PlyReader, build_with_cache, read_all_parallel};
use canopy_index::{BBox, GridIndex, OverlapPair, find_all_overlaps, neighbors_of};

use crate::config::{Mode, Settings};
use crate::crop::crop_for_target;
use crate::discover::{find_target, list_ply_files};
use crate::normalize::{Origin, normalize};
use crate::report::{save_with, write_csv, write_txt};

/// Boxes ready for searching.
#[derive(Debug)]
pub struct Prepared {
    /// Normalized boxes, box `i` has id `i`.
    pub boxes: Vec<BBox>,
    /// Offset that was subtracted from raw coordinates.
    pub origin: Origin,
    /// Grid over `boxes`.
    pub grid: GridIndex,
}

/// Discover the input clouds, compute (or reuse) their boxes, normalize and index them.
///
/// # Errors
///
/// Fails if discovery fails, any cloud cannot be read, or the cache cannot be saved.
pub fn prepare(settings: &Settings) -> Result<Prepared> {
    let files = list_ply_files(&settings.input)?;

    let raw = {
        let _span = tracing::info_span!("read_boxes", files = files.len()).entered();
        match &settings.cache {
            Some(cache_path) => {
                let outcome = build_with_cache(
                    &settings.input,
                    &files,
                    settings.threads,
                    cache_path,
                    &PlyReader,
                )
                .context("failed to build bounding boxes")?;
                let status = if outcome.updated { "updated" } else { "hit" };
                tracing::info!(cache = %cache_path.display(), status, "bounding-box cache");
                outcome.boxes
            }
            None => {
                tracing::info!("bounding-box cache disabled");
                read_all_parallel(&files, settings.threads, &PlyReader)
                    .context("failed to read bounding boxes")?
            }
        }
    };

    let (boxes, origin) = normalize(&raw);
    tracing::info!(x = origin.x, y = origin.y, z = origin.z, "normalized to dataset center");

    let started = Instant::now();
    let mut grid = GridIndex::new(settings.cell_size);
    grid.build(&boxes);
    tracing::info!(
        cell_size = settings.cell_size,
        cells = grid.occupied_cells(),
        elapsed_ms = started.elapsed().as_millis(),
        "grid built"
    );

    Ok(Prepared {
        boxes,
        origin,
        grid,
    })
}

/// Run the configured search and print a summary to `out`.
///
/// # Errors
///
/// Fails on any fatal input, cache, or report error. Crop failures are only logged.
pub fn run<W: Write>(settings: &Settings, out: &mut W) -> Result<()> {
    let mut prepared = prepare(settings)?;
    match &settings.mode {
        Mode::AllPairs { csv, txt } => all_pairs(settings, &prepared, csv, txt.as_deref(), out),
        Mode::Target { name } => single_target(settings, &mut prepared, name, out),
    }
}

fn all_pairs<W: Write>(
    settings: &Settings,
    prepared: &Prepared,
    csv: &Path,
    txt: Option<&Path>,
    out: &mut W,
) -> Result<()> {
    let started = Instant::now();
    let mut pairs: Vec<OverlapPair> = {
        let _span = tracing::info_span!("all_pairs", threads = settings.threads).entered();
        find_all_overlaps(
            &prepared.boxes,
            &prepared.grid,
            settings.threads,
            settings.proximity,
        )
    };
    pairs.sort_unstable();
    tracing::info!(
        pairs = pairs.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "all-pairs search finished"
    );

    save_with(csv, |w| write_csv(w, &prepared.boxes, &pairs))?;
    if let Some(txt) = txt {
        save_with(txt, |w| write_txt(w, &prepared.boxes, &pairs))?;
    }

    let p = settings.proximity;
    writeln!(out, "near3D pairs: {}", pairs.len())?;
    writeln!(
        out,
        "gap_xy={}  min_overlap_z={}  cell={}  threads={}",
        p.max_gap_xy, p.min_overlap_z, settings.cell_size, settings.threads
    )?;
    writeln!(out, "CSV: {}", csv.display())?;
    if let Some(txt) = txt {
        writeln!(out, "TXT: {}", txt.display())?;
    }
    Ok(())
}

fn single_target<W: Write>(
    settings: &Settings,
    prepared: &mut Prepared,
    name: &str,
    out: &mut W,
) -> Result<()> {
    let id = find_target(&prepared.boxes, name)
        .ok_or_else(|| anyhow!("target `{name}` not found in {}", settings.input.display()))?;
    let target = &prepared.boxes[id as usize];
    tracing::info!(target_file = %target.file_name(), id, "target found");

    let crop = crop_for_target(&settings.input, target, prepared.origin);

    let p = settings.proximity;
    let hits = neighbors_of(
        &mut prepared.grid,
        &prepared.boxes,
        id,
        p,
        settings.buffer,
    );

    let target = &prepared.boxes[id as usize];
    writeln!(out, "Target: {}  (id={id})", target.file_name())?;
    writeln!(
        out,
        "search_buffer={}  gap_xy={}  min_overlap_z={}  cell={}  threads={}",
        hits.search_buffer, p.max_gap_xy, p.min_overlap_z, settings.cell_size, settings.threads
    )?;
    writeln!(
        out,
        "Candidates: {} | near3D: {}",
        hits.candidates,
        hits.ids.len()
    )?;
    for n in &hits.ids {
        writeln!(out, " - {} (id={n})", prepared.boxes[*n as usize].file_name())?;
    }
    if let Some(crop) = crop {
        writeln!(out, "Crop: {}", crop.display())?;
    }
    Ok(())
}
