// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Translating boxes into a dataset-local frame.
//!
//! Survey coordinates are often large (UTM eastings in the hundreds of thousands), which
//! wastes float precision on tolerances measured in centimetres. Boxes are shifted so the
//! dataset's center sits at the origin. The cache always keeps raw coordinates.

use canopy_index::{Aabb3D, BBox};

/// Translation subtracted from raw coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Origin {
    /// X offset.
    pub x: f64,
    /// Y offset.
    pub y: f64,
    /// Z offset.
    pub z: f64,
}

impl Origin {
    /// Map a raw point into the normalized frame.
    pub fn to_local(self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        (x - self.x, y - self.y, z - self.z)
    }
}

/// Midpoint of the union of all boxes, or the zero origin when there are none.
pub fn dataset_center(boxes: &[BBox]) -> Origin {
    if boxes.is_empty() {
        return Origin::default();
    }
    let all = boxes
        .iter()
        .fold(Aabb3D::INVERTED, |acc, b| acc.union(&b.bounds));
    let c = all.center_xy();
    Origin {
        x: c.x,
        y: c.y,
        z: all.center_z(),
    }
}

/// New boxes expressed relative to the dataset center, with that center.
///
/// Ids and sources are kept.
pub fn normalize(boxes: &[BBox]) -> (Vec<BBox>, Origin) {
    let origin = dataset_center(boxes);
    let shifted = boxes
        .iter()
        .map(|b| {
            BBox::new(
                b.id,
                b.bounds.relative_to(origin.x, origin.y, origin.z),
                b.source.clone(),
            )
        })
        .collect();
    (shifted, origin)
}
