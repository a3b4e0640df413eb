//! Narrow-phase collision: clipping a displacement against obstacle shapes.
//!
//! Axes are resolved one at a time in a fixed order. Y always goes first so
//! that landing takes priority; of the horizontal axes, the one with the
//! larger displacement goes first. The box is translated by each non-zero
//! result before the next axis is resolved.

use glam::DVec3;
use strata_math::{Aabb, Axis};
use strata_voxel::{CollisionWorld, EntityId, VoxelShape, shapes_collide};

/// Returns the largest part of `displacement` that `aabb` can travel without
/// entering any of `shapes`.
pub fn collide_with_shapes(displacement: DVec3, aabb: &Aabb, shapes: &[VoxelShape]) -> DVec3 {
    if shapes.is_empty() {
        return displacement;
    }
    let (mut x, mut y, mut z) = (displacement.x, displacement.y, displacement.z);
    let mut moving = *aabb;

    if y != 0.0 {
        y = shapes_collide(Axis::Y, &moving, shapes, y);
        if y != 0.0 {
            moving = moving.move_by(DVec3::new(0.0, y, 0.0));
        }
    }

    let z_first = x.abs() < z.abs();
    if z_first && z != 0.0 {
        z = shapes_collide(Axis::Z, &moving, shapes, z);
        if z != 0.0 {
            moving = moving.move_by(DVec3::new(0.0, 0.0, z));
        }
    }

    if x != 0.0 {
        x = shapes_collide(Axis::X, &moving, shapes, x);
        if !z_first && x != 0.0 {
            moving = moving.move_by(DVec3::new(x, 0.0, 0.0));
        }
    }

    if !z_first && z != 0.0 {
        z = shapes_collide(Axis::Z, &moving, shapes, z);
    }

    DVec3::new(x, y, z)
}

/// Gathers every obstacle that can block `aabb` inside `region`: the given
/// entity shapes, the world border when the entity is close to it, and block
/// shapes.
///
/// `position` is the moving entity's position, used for the border check;
/// pass `None` for boxes that do not belong to an entity.
pub fn collect_colliders(
    world: &dyn CollisionWorld,
    position: Option<DVec3>,
    region: &Aabb,
    entity_shapes: &[VoxelShape],
) -> Vec<VoxelShape> {
    let blocks = world.block_collisions(region);
    let mut out = Vec::with_capacity(entity_shapes.len() + blocks.len() + 1);
    out.extend_from_slice(entity_shapes);
    if let Some(position) = position {
        let border = world.world_border();
        if border.is_inside_close_to_border(position, region) {
            out.push(border.collision_shape());
        }
    }
    out.extend(blocks.into_iter().map(|c| c.shape));
    out
}

/// Clips `displacement` of `aabb` against everything in the world that lies
/// along its path.
pub fn collide_bounding_box(
    world: &dyn CollisionWorld,
    position: Option<DVec3>,
    displacement: DVec3,
    aabb: &Aabb,
    entity_shapes: &[VoxelShape],
) -> DVec3 {
    let region = aabb.expand_towards(displacement);
    let colliders = collect_colliders(world, position, &region, entity_shapes);
    collide_with_shapes(displacement, aabb, &colliders)
}

/// Returns true if `aabb` overlaps any block, any entity other than
/// `exclude`, or the outside of the world border.
pub fn has_collision(
    world: &dyn CollisionWorld,
    exclude: Option<EntityId>,
    position: DVec3,
    aabb: &Aabb,
) -> bool {
    if !world.block_collisions(aabb).is_empty() {
        return true;
    }
    if !world.entity_collisions(aabb, exclude).is_empty() {
        return true;
    }
    let border = world.world_border();
    border.is_inside_close_to_border(position, aabb) && border.collision_shape().intersects(aabb)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::from_bounds(0.0, 0.0, 0.0, 1.0, 1.0, 1.0)
    }

    fn wall_at_x(x: f64) -> VoxelShape {
        VoxelShape::from_box(Aabb::from_bounds(x, -10.0, -10.0, x + 1.0, 10.0, 10.0))
    }

    #[test]
    fn test_empty_obstacles_is_identity() {
        let d = DVec3::new(0.3, -1.7, 12.5);
        assert_eq!(collide_with_shapes(d, &unit_box(), &[]), d);
    }

    #[test]
    fn test_wall_clips_x_only() {
        let shapes = [wall_at_x(2.0)];
        let out = collide_with_shapes(DVec3::new(3.0, 0.0, 0.5), &unit_box(), &shapes);
        assert!((out.x - 1.0).abs() < 1e-12);
        assert_eq!(out.z, 0.5);
    }

    #[test]
    fn test_floor_resolved_before_horizontal() {
        let floor = VoxelShape::from_box(Aabb::from_bounds(-10.0, -1.0, -10.0, 10.0, 0.0, 10.0));
        let out = collide_with_shapes(DVec3::new(0.5, -0.5, 0.0), &unit_box(), &[floor]);
        assert_eq!(out.y, 0.0);
        assert_eq!(out.x, 0.5);
    }

    #[test]
    fn test_larger_horizontal_axis_goes_first() {
        // A block diagonal to the box. Moving mostly along Z, Z is resolved
        // first and passes beside the block; X then runs into it.
        let block = VoxelShape::from_box(Aabb::from_bounds(1.5, 0.0, 1.5, 2.5, 1.0, 2.5));
        let out = collide_with_shapes(DVec3::new(1.0, 0.0, 2.0), &unit_box(), &[block.clone()]);
        assert!((out.z - 2.0).abs() < 1e-12);
        assert!((out.x - 0.5).abs() < 1e-12);

        // Mostly along X: X goes first, then Z hits the block.
        let out = collide_with_shapes(DVec3::new(2.0, 0.0, 1.0), &unit_box(), &[block]);
        assert!((out.x - 2.0).abs() < 1e-12);
        assert!((out.z - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_result_leaves_box_untranslated() {
        // Touching a wall on +X: X resolves to 0 and Z proceeds from the
        // original box.
        let shapes = [wall_at_x(1.0)];
        let out = collide_with_shapes(DVec3::new(0.5, 0.0, 0.25), &unit_box(), &shapes);
        assert_eq!(out.x, 0.0);
        assert_eq!(out.z, 0.25);
    }
}
