// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binary cache file format.
//!
//! ```text
//! magic      8 bytes  "BBXCACHE"
//! version    u32      must be 1
//! count      u32
//! count × entry:
//!   path_len u32, path bytes (UTF-8, relative, '/'-separated)
//!   size     u64
//!   mtime    i64
//!   bounds   6 × f64  min_x, max_x, min_y, max_y, min_z, max_z
//! ```
//!
//! All integers and floats are little-endian. Any malformed prefix (wrong magic, other
//! version, truncation, invalid UTF-8) loads as an empty cache.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use canopy_index::Aabb3D;

use crate::entry::{CACHE_VERSION, CacheData, CacheEntry};
use crate::error::CacheError;

/// File magic.
pub const MAGIC: &[u8; 8] = b"BBXCACHE";

struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.buf.len() < n {
            return None;
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Some(head)
    }

    fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.take(N)?.try_into().ok()
    }

    fn u32(&mut self) -> Option<u32> {
        self.array().map(u32::from_le_bytes)
    }

    fn u64(&mut self) -> Option<u64> {
        self.array().map(u64::from_le_bytes)
    }

    fn i64(&mut self) -> Option<i64> {
        self.array().map(i64::from_le_bytes)
    }

    fn f64(&mut self) -> Option<f64> {
        self.array().map(f64::from_le_bytes)
    }
}

fn parse(bytes: &[u8]) -> Result<CacheData, &'static str> {
    let mut c = Cursor { buf: bytes };
    if c.take(MAGIC.len()) != Some(&MAGIC[..]) {
        return Err("bad magic");
    }
    let version = c.u32().ok_or("truncated header")?;
    if version != CACHE_VERSION {
        return Err("unsupported version");
    }
    let count = c.u32().ok_or("truncated header")? as usize;

    let mut data = CacheData {
        version,
        ..CacheData::default()
    };
    // Each entry needs at least 68 bytes; don't trust `count` for the reservation.
    data.entries.reserve(count.min(c.buf.len() / 68));
    for _ in 0..count {
        let entry = (|| {
            let len = c.u32()? as usize;
            let rel_path = String::from_utf8(c.take(len)?.to_vec()).ok()?;
            let file_size = c.u64()?;
            let mtime = c.i64()?;
            let mut b = [0.0; 6];
            for v in &mut b {
                *v = c.f64()?;
            }
            Some(CacheEntry {
                rel_path,
                file_size,
                mtime,
                bounds: Aabb3D::from_array(b),
            })
        })()
        .ok_or("truncated entry")?;
        data.entries.insert(entry.rel_path.clone(), entry);
    }
    Ok(data)
}

impl CacheData {
    /// Load a cache file, or an empty cache if it is missing or malformed.
    ///
    /// Never fails: the cache is an optimization, so any problem just means
    /// every file is recomputed.
    pub fn load(path: &Path) -> Self {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "no bounding-box cache");
                return Self::default();
            }
        };
        match parse(&bytes) {
            Ok(data) => {
                tracing::debug!(path = %path.display(), entries = data.len(), "loaded bounding-box cache");
                data
            }
            Err(reason) => {
                tracing::debug!(path = %path.display(), reason, "ignoring unreadable bounding-box cache");
                Self::default()
            }
        }
    }

    /// Write the cache to `path`, creating parent directories.
    ///
    /// Entries are written sorted by path so identical caches produce identical files.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the file cannot be fully written.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        self.write_to(path).map_err(|source| CacheError::Persist {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), entries = self.len(), "saved bounding-box cache");
        Ok(())
    }

    fn write_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let too_big = |what| io::Error::new(io::ErrorKind::InvalidInput, what);

        let mut out = BufWriter::new(fs::File::create(path)?);
        out.write_all(MAGIC)?;
        out.write_all(&CACHE_VERSION.to_le_bytes())?;
        let count = u32::try_from(self.entries.len()).map_err(|_| too_big("too many entries"))?;
        out.write_all(&count.to_le_bytes())?;

        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_unstable_by(|a, b| a.rel_path.cmp(&b.rel_path));
        for e in entries {
            let len = u32::try_from(e.rel_path.len()).map_err(|_| too_big("path too long"))?;
            out.write_all(&len.to_le_bytes())?;
            out.write_all(e.rel_path.as_bytes())?;
            out.write_all(&e.file_size.to_le_bytes())?;
            out.write_all(&e.mtime.to_le_bytes())?;
            for v in e.bounds.to_array() {
                out.write_all(&v.to_le_bytes())?;
            }
        }
        out.into_inner().map_err(io::IntoInnerError::into_error)?.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FileStamp;

    fn sample() -> CacheData {
        let mut c = CacheData::new();
        c.insert(CacheEntry::new(
            "north/tree_1.ply",
            FileStamp { size: 1234, mtime: -17 },
            Aabb3D::new(-1.5, 2.25, 3.0, 4.0, 0.125, 9.75),
        ));
        c.insert(CacheEntry::new(
            "tree_2.ply",
            FileStamp {
                size: u64::MAX,
                mtime: i64::MAX,
            },
            Aabb3D::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
        ));
        c
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nested").join("cache.bin");
        let c = sample();
        c.save(&p).unwrap();
        assert_eq!(CacheData::load(&p), c);
    }

    #[test]
    fn identical_caches_write_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (dir.path().join("a.bin"), dir.path().join("b.bin"));
        sample().save(&a).unwrap();
        sample().save(&b).unwrap();
        assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
    }

    #[test]
    fn missing_and_empty_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CacheData::load(&dir.path().join("absent.bin")).is_empty());
        let empty = dir.path().join("empty.bin");
        fs::write(&empty, b"").unwrap();
        assert!(CacheData::load(&empty).is_empty());
    }

    #[test]
    fn malformed_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("c.bin");
        sample().save(&p).unwrap();
        let good = fs::read(&p).unwrap();

        let mut wrong_magic = good.clone();
        wrong_magic[0] = b'X';
        assert!(parse(&wrong_magic).is_err());

        let mut wrong_version = good.clone();
        wrong_version[8..12].copy_from_slice(&2_u32.to_le_bytes());
        assert!(parse(&wrong_version).is_err());

        for cut in [4, 10, 14, 20, good.len() - 1] {
            assert!(parse(&good[..cut]).is_err(), "cut at {cut}");
            fs::write(&p, &good[..cut]).unwrap();
            assert!(CacheData::load(&p).is_empty(), "cut at {cut}");
        }
    }

    #[test]
    fn huge_declared_count_is_just_truncation() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&1_u32.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        assert_eq!(parse(&bytes), Err("truncated entry"));
    }

    #[test]
    fn unwritable_destination_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let err = sample().save(&blocker.join("cache.bin")).unwrap_err();
        assert!(matches!(err, CacheError::Persist { .. }));
    }
}
