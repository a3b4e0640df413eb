use glam::DVec3;

use crate::Axis;

/// Largest span a collision box may have on any axis.
///
/// Boxes built from corrupt dimensions or runaway deltas are clamped to this
/// instead of growing until every world query covers the whole map.
pub const MAX_BOX_SPAN: f64 = 1.0e7;

/// Axis-aligned bounding box in double-precision world space.
///
/// Invariant: min.x <= max.x, min.y <= max.y, min.z <= max.z.
/// The constructor enforces this by swapping components if needed.
///
/// Overlap tests are strict: boxes that only share a face do not intersect,
/// so an entity resting on a floor is not "inside" it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// Create an AABB from two corners. Automatically sorts
    /// components so that min <= max on every axis.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create an AABB from explicit bounds.
    pub fn from_bounds(
        min_x: f64,
        min_y: f64,
        min_z: f64,
        max_x: f64,
        max_y: f64,
        max_z: f64,
    ) -> Self {
        Self::new(
            DVec3::new(min_x, min_y, min_z),
            DVec3::new(max_x, max_y, max_z),
        )
    }

    /// Unit cube occupying the block cell at integer coordinates.
    pub fn unit_at(x: i32, y: i32, z: i32) -> Self {
        let min = DVec3::new(x as f64, y as f64, z as f64);
        Self {
            min,
            max: min + DVec3::ONE,
        }
    }

    /// Box whose bottom face is centred on `base`, `width` wide on X and Z
    /// and `height` tall. Spans are clamped to `[0, MAX_BOX_SPAN]`.
    pub fn from_base(base: DVec3, width: f64, height: f64) -> Self {
        let half = clamp_span(width) / 2.0;
        let height = clamp_span(height);
        Self {
            min: DVec3::new(base.x - half, base.y, base.z - half),
            max: DVec3::new(base.x + half, base.y + height, base.z + half),
        }
    }

    /// Returns the box with every span clamped to `[0, MAX_BOX_SPAN]`,
    /// keeping the min corner fixed.
    pub fn clamp_span(&self) -> Aabb {
        let size = self.max - self.min;
        Aabb {
            min: self.min,
            max: self.min
                + DVec3::new(clamp_span(size.x), clamp_span(size.y), clamp_span(size.z)),
        }
    }

    /// Translates the box.
    pub fn move_by(&self, d: DVec3) -> Aabb {
        Aabb {
            min: self.min + d,
            max: self.max + d,
        }
    }

    /// Grows the box toward `d`: the max face moves for positive components,
    /// the min face for negative ones.
    pub fn expand_towards(&self, d: DVec3) -> Aabb {
        let mut min = self.min;
        let mut max = self.max;
        for axis in Axis::ALL {
            let v = axis.of(d);
            if v < 0.0 {
                min += axis.vector(v);
            } else if v > 0.0 {
                max += axis.vector(v);
            }
        }
        Aabb { min, max }
    }

    /// Returns a new AABB grown by `margin` on each side.
    pub fn inflate(&self, margin: f64) -> Aabb {
        self.inflate_xyz(DVec3::splat(margin))
    }

    /// Returns a new AABB grown by a per-axis margin on each side.
    pub fn inflate_xyz(&self, margin: DVec3) -> Aabb {
        Aabb::new(self.min - margin, self.max + margin)
    }

    /// Returns a new AABB shrunk by `margin` on each side.
    pub fn deflate(&self, margin: f64) -> Aabb {
        self.inflate(-margin)
    }

    /// Returns true if the interiors of the two boxes overlap.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains_point(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Returns the size along each axis.
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Returns the center point of the AABB.
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Bottom-centre point, the conventional entity position.
    pub fn bottom_center(&self) -> DVec3 {
        let c = self.center();
        DVec3::new(c.x, self.min.y, c.z)
    }

    pub fn min_on(&self, axis: Axis) -> f64 {
        axis.of(self.min)
    }

    pub fn max_on(&self, axis: Axis) -> f64 {
        axis.of(self.max)
    }

    /// Larger of the X and Z extents.
    pub fn horizontal_extent(&self) -> f64 {
        let s = self.size();
        s.x.max(s.z)
    }

    /// Returns true if the AABB has zero volume
    /// (degenerate on at least one axis).
    pub fn is_degenerate(&self) -> bool {
        self.min.x == self.max.x || self.min.y == self.max.y || self.min.z == self.max.z
    }

    /// Returns true if any bound is NaN.
    pub fn has_nan(&self) -> bool {
        self.min.is_nan() || self.max.is_nan()
    }
}

fn clamp_span(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, MAX_BOX_SPAN) }
}
