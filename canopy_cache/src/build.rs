// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Building box collections, reusing cached bounds where files are unchanged.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use canopy_index::{BBox, BoxId};

use crate::entry::{CacheData, CacheEntry, FileStamp, relative_key};
use crate::error::CacheError;
use crate::ply::GeometryReader;
use crate::pool;

/// Result of a cached build.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildOutcome {
    /// One box per input file, box `i` has id `i` and source `files[i]`.
    pub boxes: Vec<BBox>,
    /// Whether any cache entry was added or changed.
    pub updated: bool,
    /// Files served from the cache.
    pub hits: usize,
    /// Files recomputed by the reader.
    pub misses: usize,
}

struct Pending<'a> {
    id: BoxId,
    path: &'a Path,
    rel: String,
    stamp: FileStamp,
}

fn check_count(files: &[PathBuf]) -> Result<(), CacheError> {
    // Ids must fit in a `BoxId` and stay below the grid's visited-array limits.
    if BoxId::try_from(files.len()).is_err() {
        return Err(CacheError::TooManyFiles { count: files.len() });
    }
    Ok(())
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "callers check the file count with `check_count` first"
)]
fn box_id(i: usize) -> BoxId {
    i as BoxId
}

/// Bring `cache` up to date with `files` and return their boxes.
///
/// Unchanged files (same relative path, size and modification token) reuse their cached
/// bounds without touching `reader`. Everything else is read on a pool of up to `threads`
/// workers, each installing its result into `cache` under a lock. The first read failure
/// aborts the whole build; the cache may then hold some new entries but is not saved here.
///
/// # Errors
///
/// Fails if a file cannot be stat'ed or read, or if there are more files than box ids.
pub fn refresh<G>(
    cache: &mut CacheData,
    root: &Path,
    files: &[PathBuf],
    threads: usize,
    reader: &G,
) -> Result<BuildOutcome, CacheError>
where
    G: GeometryReader + ?Sized,
{
    check_count(files)?;

    let mut slots: Vec<Option<BBox>> = vec![None; files.len()];
    let mut pending = Vec::new();
    for (i, path) in files.iter().enumerate() {
        let id = box_id(i);
        let rel = relative_key(root, path);
        let stamp = FileStamp::of(path)?;
        match cache.lookup(&rel, stamp) {
            Some(hit) => slots[i] = Some(BBox::new(id, hit.bounds, path.as_path())),
            None => pending.push(Pending {
                id,
                path,
                rel,
                stamp,
            }),
        }
    }
    let misses = pending.len();
    let hits = files.len() - misses;

    let mut updated = false;
    if !pending.is_empty() {
        let shared = Mutex::new((&mut *cache, false));
        let read = pool::run(&pending, threads, |_, p| {
            let computed = reader.read_bbox(p.path, p.id)?;
            let entry = CacheEntry::new(p.rel.clone(), p.stamp, computed.bounds);
            let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
            let (data, changed) = &mut *guard;
            *changed |= data.insert(entry);
            Ok::<_, CacheError>(BBox::new(p.id, computed.bounds, p.path))
        });
        updated = shared.into_inner().unwrap_or_else(PoisonError::into_inner).1;
        for b in read? {
            let slot = b.id as usize;
            slots[slot] = Some(b);
        }
    }

    Ok(BuildOutcome {
        boxes: slots.into_iter().flatten().collect(),
        updated,
        hits,
        misses,
    })
}

/// Load the cache at `cache_path`, refresh it against `files`, and save it if anything changed.
///
/// A second run over an unmodified directory reads no geometry and writes no file.
///
/// # Errors
///
/// Propagates [`refresh`] failures. If the updated cache cannot be written, returns
/// [`CacheError::Unsaved`], which still carries the computed boxes.
pub fn build_with_cache<G>(
    root: &Path,
    files: &[PathBuf],
    threads: usize,
    cache_path: &Path,
    reader: &G,
) -> Result<BuildOutcome, CacheError>
where
    G: GeometryReader + ?Sized,
{
    let started = Instant::now();
    let mut cache = CacheData::load(cache_path);
    let outcome = refresh(&mut cache, root, files, threads, reader)?;
    if outcome.updated {
        if let Err(err) = cache.save(cache_path) {
            return Err(match err {
                CacheError::Persist { path, source } => CacheError::Unsaved {
                    path,
                    outcome: Box::new(outcome),
                    source,
                },
                other => other,
            });
        }
    }
    tracing::info!(
        files = files.len(),
        hits = outcome.hits,
        misses = outcome.misses,
        saved = outcome.updated,
        elapsed_ms = started.elapsed().as_millis(),
        "bounding boxes ready"
    );
    Ok(outcome)
}

/// Read every file's box without a cache. Box `i` has id `i`.
///
/// # Errors
///
/// The first read failure aborts the whole batch.
pub fn read_all_parallel<G>(
    files: &[PathBuf],
    threads: usize,
    reader: &G,
) -> Result<Vec<BBox>, CacheError>
where
    G: GeometryReader + ?Sized,
{
    check_count(files)?;
    let started = Instant::now();
    let boxes = pool::run(files, threads, |i, path| {
        let id = box_id(i);
        let computed = reader.read_bbox(path, id)?;
        Ok::<_, CacheError>(BBox::new(id, computed.bounds, path.as_path()))
    })?;
    tracing::info!(
        files = files.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "bounding boxes read"
    );
    Ok(boxes)
}
