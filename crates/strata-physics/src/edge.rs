//! Ledge avoidance: trims a walking displacement so the entity does not step
//! off an edge.

use std::fmt;

use glam::DVec3;
use strata_voxel::CollisionWorld;

use crate::collide::has_collision;
use crate::entity::EntityCore;
use crate::movement::MoverType;

/// Amount a displacement is backed off per probe.
const BACK_OFF_STEP: f64 = 0.05;

/// Adjusts a desired displacement before collision resolution.
pub trait EdgeAvoidance: fmt::Debug + Send + Sync {
    fn back_off(
        &self,
        entity: &EntityCore,
        desired: DVec3,
        mover: MoverType,
        world: &dyn CollisionWorld,
    ) -> DVec3;
}

/// Leaves every displacement unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEdgeAvoidance;

impl EdgeAvoidance for NoEdgeAvoidance {
    fn back_off(
        &self,
        _: &EntityCore,
        desired: DVec3,
        _: MoverType,
        _: &dyn CollisionWorld,
    ) -> DVec3 {
        desired
    }
}

/// Keeps a sneaking entity on the block it stands on.
///
/// Each horizontal component shrinks toward zero in 0.05 steps while the box,
/// moved by it and dropped by the step height, would hang over empty space.
#[derive(Clone, Copy, Debug, Default)]
pub struct SneakEdgeAvoidance;

impl EdgeAvoidance for SneakEdgeAvoidance {
    fn back_off(
        &self,
        entity: &EntityCore,
        desired: DVec3,
        mover: MoverType,
        world: &dyn CollisionWorld,
    ) -> DVec3 {
        if desired.y > 0.0
            || !matches!(mover, MoverType::SelfPropelled | MoverType::Player)
            || !entity.sneaking
            || !is_above_ground(entity, world)
        {
            return desired;
        }

        let step = entity.traits.max_step_height as f64;
        let aabb = *entity.bounding_box();
        let id = Some(entity.id());
        let falls = |dx: f64, dz: f64| {
            !has_collision(world, id, entity.position(), &aabb.move_by(DVec3::new(dx, -step, dz)))
        };

        let mut dx = desired.x;
        let mut dz = desired.z;
        while dx != 0.0 && falls(dx, 0.0) {
            dx = shrink(dx);
        }
        while dz != 0.0 && falls(0.0, dz) {
            dz = shrink(dz);
        }
        while dx != 0.0 && dz != 0.0 && falls(dx, dz) {
            dx = shrink(dx);
            dz = shrink(dz);
        }
        DVec3::new(dx, desired.y, dz)
    }
}

fn shrink(v: f64) -> f64 {
    if v < BACK_OFF_STEP && v >= -BACK_OFF_STEP {
        0.0
    } else if v > 0.0 {
        v - BACK_OFF_STEP
    } else {
        v + BACK_OFF_STEP
    }
}

fn is_above_ground(entity: &EntityCore, world: &dyn CollisionWorld) -> bool {
    if entity.on_ground() {
        return true;
    }
    let step = entity.traits.max_step_height;
    let fall = entity.fall_distance();
    fall < step
        && has_collision(
            world,
            Some(entity.id()),
            entity.position(),
            &entity
                .bounding_box()
                .move_by(DVec3::new(0.0, (fall - step) as f64, 0.0)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Dimensions, MovementTraits};
    use glam::IVec3;
    use strata_math::ChunkPos;
    use strata_voxel::{BlockDef, BlockTypeRegistry, BlockWorld};

    fn ledge_world() -> BlockWorld {
        let mut registry = BlockTypeRegistry::new();
        let stone = registry.register(BlockDef::solid("stone")).unwrap();
        let mut world = BlockWorld::new(registry);
        world.load_chunk(ChunkPos::new(0, 0));
        // Single-block platform at (0, 0, 0), top face at y = 1.
        world.set_block(IVec3::new(0, 0, 0), stone);
        world
    }

    fn sneaker() -> EntityCore {
        let mut e = EntityCore::new(
            1,
            DVec3::new(0.5, 1.0, 0.5),
            Dimensions::scalable(0.6, 1.8),
            MovementTraits::player(0.6),
        );
        e.flags.on_ground = true;
        e.sneaking = true;
        e
    }

    #[test]
    fn test_sneaking_stops_at_ledge() {
        let world = ledge_world();
        let e = sneaker();
        let out = SneakEdgeAvoidance.back_off(
            &e,
            DVec3::new(1.0, 0.0, 0.0),
            MoverType::SelfPropelled,
            &world,
        );
        // The box may overhang the edge by up to its half width.
        assert!(out.x < 0.85, "x={}", out.x);
        assert!(out.x >= 0.0);
    }

    #[test]
    fn test_not_sneaking_passes_through() {
        let world = ledge_world();
        let mut e = sneaker();
        e.sneaking = false;
        let desired = DVec3::new(1.0, 0.0, 0.0);
        assert_eq!(
            SneakEdgeAvoidance.back_off(&e, desired, MoverType::SelfPropelled, &world),
            desired
        );
    }

    #[test]
    fn test_piston_moves_ignore_ledges() {
        let world = ledge_world();
        let e = sneaker();
        let desired = DVec3::new(1.0, 0.0, 0.0);
        assert_eq!(
            SneakEdgeAvoidance.back_off(&e, desired, MoverType::Piston, &world),
            desired
        );
    }

    #[test]
    fn test_shrink_snaps_small_values_to_zero() {
        assert_eq!(shrink(0.04), 0.0);
        assert_eq!(shrink(-0.05), 0.0);
        assert!((shrink(0.3) - 0.25).abs() < 1e-12);
        assert!((shrink(-0.3) + 0.25).abs() < 1e-12);
    }
}
