//! Collision volumes made of axis-aligned boxes and the per-axis sweep clamp.
//!
//! A [`VoxelShape`] is the unit every obstacle is expressed in: block geometry,
//! world-border slabs, and other entities' boxes. [`VoxelShape::collide`] answers
//! "how far may this box travel along one axis before touching me".

use glam::{DVec3, IVec3};
use strata_math::{Aabb, Axis};

/// Tolerance used by every sweep test. Deltas smaller than this are treated
/// as no movement, and boxes within this distance count as touching.
pub const COLLISION_EPSILON: f64 = 1.0e-7;

/// A solid volume made of zero or more boxes in world space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoxelShape {
    boxes: Vec<Aabb>,
}

impl VoxelShape {
    /// Shape with no volume. Never blocks anything.
    pub fn empty() -> Self {
        Self { boxes: Vec::new() }
    }

    /// Full unit cube at the origin.
    pub fn block() -> Self {
        Self::from_box(Aabb::unit_at(0, 0, 0))
    }

    pub fn from_box(aabb: Aabb) -> Self {
        Self { boxes: vec![aabb] }
    }

    pub fn from_boxes(boxes: Vec<Aabb>) -> Self {
        Self { boxes }
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    /// Returns the shape translated by `d`.
    pub fn move_by(&self, d: DVec3) -> VoxelShape {
        VoxelShape {
            boxes: self.boxes.iter().map(|b| b.move_by(d)).collect(),
        }
    }

    /// Returns a block-local shape placed at the given block cell.
    pub fn at_block(&self, pos: IVec3) -> VoxelShape {
        self.move_by(pos.as_dvec3())
    }

    /// Smallest box enclosing the whole shape, or `None` when empty.
    pub fn bounds(&self) -> Option<Aabb> {
        let first = *self.boxes.first()?;
        Some(self.boxes[1..].iter().fold(first, |acc, b| {
            Aabb::new(acc.min.min(b.min), acc.max.max(b.max))
        }))
    }

    /// Distinct boundary coordinates along `axis`, sorted ascending.
    pub fn coords(&self, axis: Axis) -> Vec<f64> {
        let mut out: Vec<f64> = self
            .boxes
            .iter()
            .flat_map(|b| [b.min_on(axis), b.max_on(axis)])
            .collect();
        out.sort_by(f64::total_cmp);
        out.dedup();
        out
    }

    /// Returns true if any box of this shape overlaps `region`.
    pub fn intersects(&self, region: &Aabb) -> bool {
        self.boxes.iter().any(|b| b.intersects(region))
    }

    /// Clamps `delta`, a displacement of `moving` along `axis`, so the box
    /// does not end up overlapping any box of this shape.
    ///
    /// Only boxes overlapping `moving` on both other axes (shrunk by
    /// [`COLLISION_EPSILON`]) and lying ahead of it in the direction of
    /// travel can clip the delta.
    pub fn collide(&self, axis: Axis, moving: &Aabb, mut delta: f64) -> f64 {
        for b in &self.boxes {
            if delta.abs() < COLLISION_EPSILON {
                return 0.0;
            }
            delta = clip_box(axis, moving, b, delta);
        }
        delta
    }
}

/// Folds [`VoxelShape::collide`] over a list of shapes.
pub fn shapes_collide(axis: Axis, moving: &Aabb, shapes: &[VoxelShape], mut delta: f64) -> f64 {
    for shape in shapes {
        if delta.abs() < COLLISION_EPSILON {
            return 0.0;
        }
        delta = shape.collide(axis, moving, delta);
    }
    delta
}

fn clip_box(axis: Axis, moving: &Aabb, obstacle: &Aabb, delta: f64) -> f64 {
    let (a, b) = axis.others();
    if !overlaps_on(a, moving, obstacle) || !overlaps_on(b, moving, obstacle) {
        return delta;
    }
    if delta > 0.0 {
        let gap = obstacle.min_on(axis) - moving.max_on(axis);
        if gap >= -COLLISION_EPSILON {
            return delta.min(gap);
        }
    } else if delta < 0.0 {
        let gap = obstacle.max_on(axis) - moving.min_on(axis);
        if gap <= COLLISION_EPSILON {
            return delta.max(gap);
        }
    }
    delta
}

fn overlaps_on(axis: Axis, moving: &Aabb, obstacle: &Aabb) -> bool {
    obstacle.min_on(axis) < moving.max_on(axis) - COLLISION_EPSILON
        && obstacle.max_on(axis) > moving.min_on(axis) + COLLISION_EPSILON
}
