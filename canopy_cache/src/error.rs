// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for geometry reads and cache builds.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::build::BuildOutcome;
use crate::ply::VertexFields;

/// Failure to read or write a PLY point cloud.
#[derive(Debug, Error)]
pub enum PlyError {
    /// The file could not be opened or read.
    #[error("failed to read {path}")]
    Io {
        /// Offending file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The header is not a valid PLY header.
    #[error("malformed PLY header in {path}: {reason}")]
    Header {
        /// Offending file.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },
    /// A property uses a scalar type this reader does not know.
    #[error("unsupported PLY scalar type `{name}` in {path}")]
    UnsupportedType {
        /// Offending file.
        path: PathBuf,
        /// Type name as written in the header.
        name: String,
    },
    /// The vertex element lacks some of the x, y, z properties.
    #[error("PLY vertex element in {path} lacks coordinates {missing:?}")]
    MissingVertexFields {
        /// Offending file.
        path: PathBuf,
        /// Coordinates that were not found.
        missing: VertexFields,
    },
    /// The vertex element is empty.
    #[error("PLY file {path} has no vertices")]
    NoVertices {
        /// Offending file.
        path: PathBuf,
    },
    /// The body ended before every declared row was read.
    #[error("PLY body of {path} is truncated")]
    Truncated {
        /// Offending file.
        path: PathBuf,
    },
    /// An ASCII body token is not a number.
    #[error("invalid value `{token}` in PLY body of {path}")]
    BadValue {
        /// Offending file.
        path: PathBuf,
        /// Token that failed to parse.
        token: String,
    },
    /// Writing an output cloud failed.
    #[error("failed to write {path}")]
    Write {
        /// Output file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Failure of a bounding-box build or of cache persistence.
///
/// A malformed cache file is never an error; it loads as an empty cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// An input file's size or modification time could not be read.
    #[error("failed to stat {path}")]
    Stat {
        /// Input file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Computing a bounding box failed; the whole build is abandoned.
    #[error(transparent)]
    Read(#[from] PlyError),
    /// The cache file could not be written. Boxes computed in memory are still valid.
    #[error("failed to persist bounding-box cache to {path}")]
    Persist {
        /// Cache file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A build succeeded but its updated cache could not be written.
    ///
    /// The boxes are still valid; recover them with [`CacheError::into_outcome`].
    #[error("failed to persist bounding-box cache to {path}")]
    Unsaved {
        /// Cache file.
        path: PathBuf,
        /// The completed build.
        outcome: Box<BuildOutcome>,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// More files were supplied than box ids can address.
    #[error("{count} input files exceed the supported number of boxes")]
    TooManyFiles {
        /// Number of files supplied.
        count: usize,
    },
}

impl CacheError {
    /// The completed build carried by [`CacheError::Unsaved`], if any.
    pub fn into_outcome(self) -> Option<BuildOutcome> {
        match self {
            Self::Unsaved { outcome, .. } => Some(*outcome),
            _ => None,
        }
    }
}
