// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounding boxes and the proximity predicates used to compare them.
//!
//! All predicates are pure functions over two boxes plus numeric tolerances.
//! Float inputs are assumed to be finite (no NaNs).

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use kurbo::{Point, Rect};

/// Identifier of a box: its position in the owning collection.
///
/// Assigned once when the box is created and never reused within a run.
pub type BoxId = u32;

/// Axis-aligned bounding box in 3D.
///
/// Bounds are stored per axis, minimum then maximum, the same order used by the
/// on-disk cache. A well-formed box has `min <= max` on every axis; degenerate
/// (zero extent) boxes are fine, inverted ones must not be used as query inputs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3D {
    /// Minimum x.
    pub min_x: f64,
    /// Maximum x.
    pub max_x: f64,
    /// Minimum y.
    pub min_y: f64,
    /// Maximum y.
    pub max_y: f64,
    /// Minimum z (bottom).
    pub min_z: f64,
    /// Maximum z (top).
    pub max_z: f64,
}

impl Aabb3D {
    /// A box that contains nothing; growing it by a point yields that point.
    ///
    /// This is the starting value when folding vertices into bounds.
    pub const INVERTED: Self = Self {
        min_x: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        min_y: f64::INFINITY,
        max_y: f64::NEG_INFINITY,
        min_z: f64::INFINITY,
        max_z: f64::NEG_INFINITY,
    };

    /// Create a box from per-axis `(min, max)` bounds.
    pub const fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64, min_z: f64, max_z: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            min_z,
            max_z,
        }
    }

    /// Create a box from the six bounds in `[min_x, max_x, min_y, max_y, min_z, max_z]` order.
    pub const fn from_array(b: [f64; 6]) -> Self {
        Self::new(b[0], b[1], b[2], b[3], b[4], b[5])
    }

    /// The six bounds in `[min_x, max_x, min_y, max_y, min_z, max_z]` order.
    pub const fn to_array(&self) -> [f64; 6] {
        [
            self.min_x, self.max_x, self.min_y, self.max_y, self.min_z, self.max_z,
        ]
    }

    /// Vertical extent, `max_z - min_z`.
    pub fn height(&self) -> f64 {
        self.max_z - self.min_z
    }

    /// Midpoint of the XY extent.
    pub fn center_xy(&self) -> Point {
        Point::new(0.5 * (self.min_x + self.max_x), 0.5 * (self.min_y + self.max_y))
    }

    /// Midpoint of the Z extent.
    pub fn center_z(&self) -> f64 {
        0.5 * (self.min_z + self.max_z)
    }

    /// Horizontal footprint as a Kurbo rectangle.
    pub fn footprint(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Return true if any axis is inverted (`max < min`).
    pub fn is_inverted(&self) -> bool {
        self.max_x < self.min_x || self.max_y < self.min_y || self.max_z < self.min_z
    }

    /// Grow the box so it contains the point.
    #[inline]
    pub fn include_point(&mut self, x: f64, y: f64, z: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
        self.min_z = self.min_z.min(z);
        self.max_z = self.max_z.max(z);
    }

    /// The smallest box containing both.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
            min_z: self.min_z.min(other.min_z),
            max_z: self.max_z.max(other.max_z),
        }
    }

    /// A copy shifted by `(-dx, -dy, -dz)`, i.e. expressed relative to that origin.
    pub fn relative_to(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            min_x: self.min_x - dx,
            max_x: self.max_x - dx,
            min_y: self.min_y - dy,
            max_y: self.max_y - dy,
            min_z: self.min_z - dz,
            max_z: self.max_z - dz,
        }
    }

    /// Whether the XY footprint contains the point, boundaries included.
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// A bounding box owned by a collection, tagged with its id and source file.
///
/// Boxes are write-once: created by a geometry reader or restored from a cache
/// and never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct BBox {
    /// Spatial extent.
    pub bounds: Aabb3D,
    /// Position in the owning collection.
    pub id: BoxId,
    /// File the box was computed from.
    pub source: PathBuf,
}

impl BBox {
    /// Create a box.
    pub fn new(id: BoxId, bounds: Aabb3D, source: impl Into<PathBuf>) -> Self {
        Self {
            bounds,
            id,
            source: source.into(),
        }
    }

    /// Vertical extent of the box.
    pub fn height(&self) -> f64 {
        self.bounds.height()
    }

    /// Source file name without its directory, for reports.
    pub fn file_name(&self) -> Cow<'_, str> {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| self.source.to_string_lossy())
    }

    /// Source path.
    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Length of the intersection of two closed intervals, or 0 if they are disjoint.
#[inline]
pub fn overlap_1d(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> f64 {
    (a_max.min(b_max) - a_min.max(b_min)).max(0.0)
}

/// Distance between the nearest edges of two closed intervals, or 0 if they overlap or touch.
#[inline]
pub fn gap_1d(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> f64 {
    if a_max < b_min {
        b_min - a_max
    } else if b_max < a_min {
        a_min - b_max
    } else {
        0.0
    }
}

/// Copy of `b` with its X and Y bounds grown by `buffer` on every side.
///
/// `buffer` must be non-negative; this is not checked.
pub fn expand_xy(b: &Aabb3D, buffer: f64) -> Aabb3D {
    let r = b.footprint().inflate(buffer, buffer);
    Aabb3D {
        min_x: r.x0,
        max_x: r.x1,
        min_y: r.y0,
        max_y: r.y1,
        ..*b
    }
}

#[inline]
fn overlaps_axis(a_min: f64, a_max: f64, b_min: f64, b_max: f64, eps: f64) -> bool {
    a_min <= b_max + eps && b_min <= a_max + eps
}

/// Whether the XY footprints intersect, touching included, with a symmetric tolerance.
pub fn overlaps_xy(a: &Aabb3D, b: &Aabb3D, eps: f64) -> bool {
    overlaps_axis(a.min_x, a.max_x, b.min_x, b.max_x, eps)
        && overlaps_axis(a.min_y, a.max_y, b.min_y, b.max_y, eps)
}

/// Whether the boxes intersect on all three axes, touching included, with a symmetric tolerance.
pub fn overlaps_3d(a: &Aabb3D, b: &Aabb3D, eps: f64) -> bool {
    overlaps_xy(a, b, eps) && overlaps_axis(a.min_z, a.max_z, b.min_z, b.max_z, eps)
}

/// The proximity test: close in XY, genuinely overlapping in Z.
///
/// True iff the Z overlap is at least `min_overlap_z` and the X and Y gaps are both
/// at most `max_gap_xy`. The Z condition rejects boxes stacked vertically (undergrowth
/// under a canopy) even when their footprints coincide.
pub fn near_3d(a: &Aabb3D, b: &Aabb3D, min_overlap_z: f64, max_gap_xy: f64) -> bool {
    let oz = overlap_1d(a.min_z, a.max_z, b.min_z, b.max_z);
    if oz < min_overlap_z {
        return false;
    }
    let gx = gap_1d(a.min_x, a.max_x, b.min_x, b.max_x);
    let gy = gap_1d(a.min_y, a.max_y, b.min_y, b.max_y);
    gx <= max_gap_xy && gy <= max_gap_xy
}

/// Tolerances for [`near_3d`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Proximity {
    /// Largest allowed gap between footprints on X and on Y.
    pub max_gap_xy: f64,
    /// Smallest required overlap in Z.
    pub min_overlap_z: f64,
}

impl Proximity {
    /// Create a tolerance pair.
    pub const fn new(max_gap_xy: f64, min_overlap_z: f64) -> Self {
        Self {
            max_gap_xy,
            min_overlap_z,
        }
    }

    /// Whether `a` and `b` are near under these tolerances.
    #[inline]
    pub fn accepts(&self, a: &Aabb3D, b: &Aabb3D) -> bool {
        near_3d(a, b, self.min_overlap_z, self.max_gap_xy)
    }
}

impl Default for Proximity {
    /// Four centimetres of XY gap and of Z overlap.
    fn default() -> Self {
        Self::new(0.04, 0.04)
    }
}
