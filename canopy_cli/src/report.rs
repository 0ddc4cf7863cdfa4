// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CSV and text reports of near pairs.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use canopy_index::{BBox, OverlapPair};

/// Header row of the CSV report.
pub const CSV_HEADER: &str = "a_id,b_id,a_file,b_file,a_height,b_height,a_minZ,a_maxZ,b_minZ,b_maxZ";

/// Write one CSV row per pair, file names only.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_csv<W: Write>(out: &mut W, boxes: &[BBox], pairs: &[OverlapPair]) -> io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for p in pairs {
        let (a, b) = (&boxes[p.a as usize], &boxes[p.b as usize]);
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            p.a,
            p.b,
            a.file_name(),
            b.file_name(),
            a.height(),
            b.height(),
            a.bounds.min_z,
            a.bounds.max_z,
            b.bounds.min_z,
            b.bounds.max_z,
        )?;
    }
    Ok(())
}

/// Write one `<a> (h=<height>)  <->  <b> (h=<height>)` line per pair.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_txt<W: Write>(out: &mut W, boxes: &[BBox], pairs: &[OverlapPair]) -> io::Result<()> {
    for p in pairs {
        let (a, b) = (&boxes[p.a as usize], &boxes[p.b as usize]);
        writeln!(
            out,
            "{} (h={})  <->  {} (h={})",
            a.file_name(),
            a.height(),
            b.file_name(),
            b.height(),
        )?;
    }
    Ok(())
}

/// Create `path` (and its parent directories) and fill it with `write`.
///
/// # Errors
///
/// Fails if the file cannot be created or written.
pub fn save_with<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let save = || -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);
        write(&mut out)?;
        out.flush()
    };
    save().with_context(|| format!("failed to write {}", path.display()))
}
