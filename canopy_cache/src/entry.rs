// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cache entries and the file identity they are keyed on.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path};
use std::time::{SystemTime, UNIX_EPOCH};

use canopy_index::Aabb3D;

use crate::error::CacheError;

/// Current on-disk format version.
pub const CACHE_VERSION: u32 = 1;

/// Identity of a file on disk as seen by the cache: size plus modification time.
///
/// The modification token is nanoseconds relative to the Unix epoch (negative before it).
/// It is only meaningful on the machine and filesystem that produced it; a file edited
/// without changing either its size or its mtime is not detected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileStamp {
    /// File size in bytes.
    pub size: u64,
    /// Modification-time token.
    pub mtime: i64,
}

impl FileStamp {
    /// Read the current stamp of `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file's metadata or modification time is unavailable.
    pub fn of(path: &Path) -> Result<Self, CacheError> {
        let stat_err = |source| CacheError::Stat {
            path: path.to_path_buf(),
            source,
        };
        let meta = fs::metadata(path).map_err(stat_err)?;
        let modified = meta.modified().map_err(stat_err)?;
        Ok(Self {
            size: meta.len(),
            mtime: mtime_token(modified),
        })
    }
}

fn mtime_token(t: SystemTime) -> i64 {
    let clamp = |nanos: u128| i64::try_from(nanos).unwrap_or(i64::MAX);
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => clamp(d.as_nanos()),
        Err(before) => -clamp(before.duration().as_nanos()),
    }
}

/// A previously computed bounding box and the identity of the file it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    /// Path relative to the input root, `/`-separated.
    pub rel_path: String,
    /// File size when the box was computed.
    pub file_size: u64,
    /// Modification token when the box was computed.
    pub mtime: i64,
    /// Raw bounds as read from the file.
    pub bounds: Aabb3D,
}

impl CacheEntry {
    /// Create an entry from a file stamp.
    pub fn new(rel_path: impl Into<String>, stamp: FileStamp, bounds: Aabb3D) -> Self {
        Self {
            rel_path: rel_path.into(),
            file_size: stamp.size,
            mtime: stamp.mtime,
            bounds,
        }
    }

    /// Whether this entry still describes a file with `stamp`.
    ///
    /// Any mismatch means stale, never corrupt.
    pub fn is_fresh(&self, stamp: FileStamp) -> bool {
        self.file_size == stamp.size && self.mtime == stamp.mtime
    }
}

/// The whole cache: a version tag and entries keyed by relative path.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheData {
    /// Format version the data was loaded with.
    pub version: u32,
    /// Entries keyed by [`CacheEntry::rel_path`].
    pub entries: HashMap<String, CacheEntry>,
}

impl Default for CacheData {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: HashMap::new(),
        }
    }
}

impl CacheData {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry for `rel_path`, if it matches `stamp`.
    pub fn lookup(&self, rel_path: &str, stamp: FileStamp) -> Option<&CacheEntry> {
        self.entries.get(rel_path).filter(|e| e.is_fresh(stamp))
    }

    /// Install or overwrite the entry for its path. Returns true if the cache changed.
    pub fn insert(&mut self, entry: CacheEntry) -> bool {
        match self.entries.get(&entry.rel_path) {
            Some(old) if *old == entry => false,
            _ => {
                self.entries.insert(entry.rel_path.clone(), entry);
                true
            }
        }
    }
}

/// `path` relative to `root` with `/` separators.
///
/// Paths outside `root` are kept whole so they still key uniquely.
pub fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut key = String::new();
    for c in rel.components() {
        let part = match c {
            Component::Prefix(p) => p.as_os_str().to_string_lossy(),
            Component::RootDir => {
                key.push('/');
                continue;
            }
            Component::CurDir => continue,
            Component::ParentDir => "..".into(),
            Component::Normal(n) => n.to_string_lossy(),
        };
        if !key.is_empty() && !key.ends_with('/') {
            key.push('/');
        }
        key.push_str(&part);
    }
    key
}
