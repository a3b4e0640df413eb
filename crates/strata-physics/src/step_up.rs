//! Obstacle collection and step-up for an entity's desired displacement.
//!
//! When a horizontal move is blocked at ground level, the entity may rise onto
//! the obstacle if its top lies within the step height. Candidate heights come
//! from the Y boundaries of nearby obstacles; the first that lets the entity
//! travel further horizontally than the plain resolution wins.

use glam::DVec3;
use strata_math::{Aabb, Axis, horizontal_distance_sqr};
use strata_voxel::{CollisionWorld, VoxelShape};
use tracing::debug;

use crate::collide::{collect_colliders, collide_bounding_box, collide_with_shapes};
use crate::entity::EntityCore;

/// Vertical padding added below the swept region when the step does not start
/// from a fall, so the floor under the entity is included.
const STEP_SWEEP_PADDING: f64 = -1.0e-5;

impl EntityCore {
    /// Resolves `desired` against blocks, other entities and the world border,
    /// stepping up low obstacles when the entity is able to.
    pub fn collide(&self, desired: DVec3, world: &dyn CollisionWorld) -> DVec3 {
        let aabb = *self.bounding_box();
        let position = Some(self.position());
        let entity_shapes = world.entity_collisions(&aabb.expand_towards(desired), Some(self.id()));

        let resolved = if desired.length_squared() == 0.0 {
            desired
        } else {
            collide_bounding_box(world, position, desired, &aabb, &entity_shapes)
        };

        let x_clipped = desired.x != resolved.x;
        let z_clipped = desired.z != resolved.z;
        let falling = desired.y != resolved.y && desired.y < 0.0;
        let max_step = self.traits.max_step_height;

        if max_step <= 0.0 || !(self.on_ground() || falling) || !(x_clipped || z_clipped) {
            return resolved;
        }

        let (step_box, sweep) = step_region(&aabb, desired, resolved.y, falling, max_step);
        let colliders = collect_colliders(world, position, &sweep, &entity_shapes);

        let base_distance = horizontal_distance_sqr(resolved);
        for height in candidate_step_heights(&step_box, &colliders, max_step, resolved.y as f32) {
            let stepped = collide_with_shapes(
                DVec3::new(desired.x, height as f64, desired.z),
                &step_box,
                &colliders,
            );
            if horizontal_distance_sqr(stepped) > base_distance {
                let lift = step_box.min.y - aabb.min.y;
                debug!(entity = self.id(), height, "Stepped up");
                return stepped + DVec3::new(0.0, lift, 0.0);
            }
        }
        resolved
    }
}

/// Box the step starts from and the region swept by it. A step out of a fall
/// starts where the fall was stopped; otherwise it starts from `aabb` and the
/// region reaches just under the feet.
fn step_region(
    aabb: &Aabb,
    desired: DVec3,
    resolved_y: f64,
    falling: bool,
    max_step: f32,
) -> (Aabb, Aabb) {
    let step_box = if falling {
        aabb.move_by(DVec3::new(0.0, resolved_y, 0.0))
    } else {
        *aabb
    };
    let sweep = step_box.expand_towards(DVec3::new(desired.x, max_step as f64, desired.z));
    if falling {
        (step_box, sweep)
    } else {
        (step_box, sweep.expand_towards(DVec3::new(0.0, STEP_SWEEP_PADDING, 0.0)))
    }
}

/// Distinct heights, relative to the bottom of `step_box`, at which some
/// obstacle face lies within `max_step`. Sorted ascending.
///
/// Heights are computed in `f32`; `current_y` is excluded.
pub fn candidate_step_heights(
    step_box: &Aabb,
    colliders: &[VoxelShape],
    max_step: f32,
    current_y: f32,
) -> Vec<f32> {
    let mut heights: Vec<f32> = Vec::new();
    for shape in colliders {
        for coord in shape.coords(Axis::Y) {
            let height = (coord - step_box.min.y) as f32;
            if height < 0.0 || height == current_y {
                continue;
            }
            if height > max_step {
                break;
            }
            if !heights.contains(&height) {
                heights.push(height);
            }
        }
    }
    heights.sort_by(f32::total_cmp);
    heights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slab(top: f64) -> VoxelShape {
        VoxelShape::from_box(Aabb::from_bounds(1.0, 0.0, 0.0, 2.0, top, 1.0))
    }

    #[test]
    fn test_candidates_are_sorted_and_bounded() {
        let step_box = Aabb::from_bounds(0.0, 0.0, 0.0, 0.6, 1.8, 0.6);
        let shapes = [slab(0.5), slab(0.25), slab(0.5), slab(1.0)];
        let heights = candidate_step_heights(&step_box, &shapes, 0.6, 0.0);
        assert_eq!(heights, vec![0.25, 0.5]);
    }

    #[test]
    fn test_candidates_skip_faces_below_box() {
        let step_box = Aabb::from_bounds(0.0, 1.0, 0.0, 0.6, 2.8, 0.6);
        let floor = VoxelShape::from_box(Aabb::from_bounds(0.0, 0.0, 0.0, 1.0, 1.0, 1.0));
        let heights = candidate_step_heights(&step_box, &[floor], 0.6, 0.5);
        assert_eq!(heights, vec![0.0]);
        let heights = candidate_step_heights(&step_box, &[slab(2.0)], 0.6, 0.0);
        assert!(heights.is_empty());
    }

    #[test]
    fn test_infinite_border_faces_are_ignored() {
        let step_box = Aabb::from_bounds(0.0, 0.0, 0.0, 0.6, 1.8, 0.6);
        let wall = VoxelShape::from_box(Aabb::from_bounds(
            1.0,
            f64::NEG_INFINITY,
            0.0,
            2.0,
            f64::INFINITY,
            1.0,
        ));
        assert!(candidate_step_heights(&step_box, &[wall], 0.6, 0.0).is_empty());
    }

    #[test]
    fn test_rising_step_starts_from_unmoved_box() {
        let aabb = Aabb::from_bounds(0.2, 1.0, 0.2, 0.8, 2.8, 0.8);
        // A jump cut short by a ceiling: the lift so far is discarded.
        let (step_box, sweep) = step_region(&aabb, DVec3::new(0.5, 0.42, 0.0), 0.2, false, 0.6);
        assert_eq!(step_box, aabb);
        assert_eq!(sweep.min.y, 1.0 + STEP_SWEEP_PADDING);
        assert!(sweep.max.abs_diff_eq(DVec3::new(1.3, 3.4, 0.8), 1e-6));
    }

    #[test]
    fn test_falling_step_starts_where_fall_stopped() {
        let aabb = Aabb::from_bounds(0.2, 1.5, 0.2, 0.8, 3.3, 0.8);
        let (step_box, sweep) = step_region(&aabb, DVec3::new(0.5, -0.8, 0.0), -0.5, true, 0.6);
        assert_eq!(step_box, aabb.move_by(DVec3::new(0.0, -0.5, 0.0)));
        assert_eq!(sweep.min.y, 1.0);
        assert!((sweep.max.x - 1.3).abs() < 1e-9);
        assert!((sweep.max.y - 3.4).abs() < 1e-6);
    }
}
