//! Square world border centred on a point of the XZ plane.
//!
//! Outside the border is solid: entities close to it collide with four
//! infinitely tall slabs surrounding the playable square.

use glam::DVec3;
use strata_math::Aabb;

use crate::shape::VoxelShape;

/// Largest coordinate any border edge may reach.
pub const ABSOLUTE_MAX_EXTENT: f64 = 29_999_984.0;

/// Default side length of the border.
pub const DEFAULT_BORDER_SIZE: f64 = 59_999_968.0;

#[derive(Clone, Debug, PartialEq)]
pub struct WorldBorder {
    center_x: f64,
    center_z: f64,
    size: f64,
}

impl WorldBorder {
    /// Border of side `size` centred on `(center_x, center_z)`.
    pub fn new(center_x: f64, center_z: f64, size: f64) -> Self {
        Self {
            center_x,
            center_z,
            size: size.max(1.0),
        }
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn min_x(&self) -> f64 {
        (self.center_x - self.size / 2.0).max(-ABSOLUTE_MAX_EXTENT)
    }

    pub fn max_x(&self) -> f64 {
        (self.center_x + self.size / 2.0).min(ABSOLUTE_MAX_EXTENT)
    }

    pub fn min_z(&self) -> f64 {
        (self.center_z - self.size / 2.0).max(-ABSOLUTE_MAX_EXTENT)
    }

    pub fn max_z(&self) -> f64 {
        (self.center_z + self.size / 2.0).min(ABSOLUTE_MAX_EXTENT)
    }

    /// Distance from a point to the nearest border edge. Negative outside.
    pub fn distance_to_border(&self, x: f64, z: f64) -> f64 {
        let to_min_z = z - self.min_z();
        let to_max_z = self.max_z() - z;
        let to_min_x = x - self.min_x();
        let to_max_x = self.max_x() - x;
        to_min_x.min(to_max_x).min(to_min_z.min(to_max_z))
    }

    /// Returns true if `(x, z)` lies inside the border grown by `margin`.
    pub fn is_within_bounds(&self, x: f64, z: f64, margin: f64) -> bool {
        x >= self.min_x() - margin
            && x < self.max_x() + margin
            && z >= self.min_z() - margin
            && z < self.max_z() + margin
    }

    /// Returns true if an entity at `position` with box `aabb` is inside the
    /// border and close enough that the border must join its obstacle set.
    pub fn is_inside_close_to_border(&self, position: DVec3, aabb: &Aabb) -> bool {
        let margin = aabb.horizontal_extent().max(1.0);
        self.distance_to_border(position.x, position.z) < margin * 2.0
            && self.is_within_bounds(position.x, position.z, margin)
    }

    /// Solid region outside the border: four slabs of unbounded height.
    pub fn collision_shape(&self) -> VoxelShape {
        let inf = f64::INFINITY;
        let (min_x, max_x, min_z, max_z) = (self.min_x(), self.max_x(), self.min_z(), self.max_z());
        VoxelShape::from_boxes(vec![
            Aabb::from_bounds(-inf, -inf, -inf, min_x, inf, inf),
            Aabb::from_bounds(max_x, -inf, -inf, inf, inf, inf),
            Aabb::from_bounds(min_x, -inf, -inf, max_x, inf, min_z),
            Aabb::from_bounds(min_x, -inf, max_z, max_x, inf, inf),
        ])
    }
}

impl Default for WorldBorder {
    fn default() -> Self {
        Self::new(0.0, 0.0, DEFAULT_BORDER_SIZE)
    }
}
