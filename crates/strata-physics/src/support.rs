//! Grounded state, the supporting-block cache, and the block lookups that
//! depend on it.

use glam::{DVec3, IVec3};
use strata_math::{Aabb, block_containing, floor_i32};
use strata_voxel::{BlockDef, CollisionWorld, FluidKind};

use crate::entity::EntityCore;

/// Depth of the slice under the box probed for a supporting block.
const SUPPORT_PROBE_DEPTH: f64 = 1.0e-6;
/// Offset used by [`EntityCore::on_pos`].
const ON_POS_OFFSET: f32 = 1.0e-5;
/// Offset used by [`EntityCore::on_pos_legacy`].
const LEGACY_ON_POS_OFFSET: f32 = 0.2;
/// Offset used by [`EntityCore::block_pos_below_that_affects_my_movement`].
const MOVEMENT_AFFECTING_OFFSET: f32 = 0.500_001;

impl EntityCore {
    /// Sets the grounded flag and refreshes the supporting-block cache.
    ///
    /// `movement` is the displacement just applied. When nothing is found
    /// directly underneath, the probe is retried at the position the entity
    /// came from, so walking off an edge keeps the block it left.
    pub fn set_on_ground_with_known_movement(
        &mut self,
        on_ground: bool,
        movement: Option<DVec3>,
        world: &dyn CollisionWorld,
    ) {
        self.flags.on_ground = on_ground;
        self.check_supporting_block(on_ground, movement, world);
    }

    fn check_supporting_block(
        &mut self,
        on_ground: bool,
        movement: Option<DVec3>,
        world: &dyn CollisionWorld,
    ) {
        if !on_ground {
            self.on_ground_no_blocks = false;
            self.supporting_block = None;
            return;
        }
        let aabb = self.bounding_box();
        let probe = Aabb::from_bounds(
            aabb.min.x,
            aabb.min.y - SUPPORT_PROBE_DEPTH,
            aabb.min.z,
            aabb.max.x,
            aabb.min.y,
            aabb.max.z,
        );
        let mut found = find_supporting_block(world, self.position(), &probe);
        if found.is_none() && !self.on_ground_no_blocks {
            if let Some(m) = movement {
                let retry = probe.move_by(DVec3::new(-m.x, 0.0, -m.z));
                found = find_supporting_block(world, self.position(), &retry);
                self.supporting_block = found;
            }
        } else {
            self.supporting_block = found;
        }
        self.on_ground_no_blocks = found.is_none();
    }

    /// Block the entity stands on, just under its feet.
    pub fn on_pos(&self, world: &dyn CollisionWorld) -> IVec3 {
        self.on_pos_with_offset(ON_POS_OFFSET, world)
    }

    /// Block 0.2 under the feet, used for fall and step effects.
    pub fn on_pos_legacy(&self, world: &dyn CollisionWorld) -> IVec3 {
        self.on_pos_with_offset(LEGACY_ON_POS_OFFSET, world)
    }

    /// Block whose speed and jump factors apply to the entity.
    pub fn block_pos_below_that_affects_my_movement(&self, world: &dyn CollisionWorld) -> IVec3 {
        self.on_pos_with_offset(MOVEMENT_AFFECTING_OFFSET, world)
    }

    /// Cell `offset` below the feet. A cached supporting block supplies X and
    /// Z; tall supports (fences, walls) are returned as-is for offsets up to
    /// half a block.
    fn on_pos_with_offset(&self, offset: f32, world: &dyn CollisionWorld) -> IVec3 {
        let Some(support) = self.supporting_block else {
            return block_containing(self.position() - DVec3::new(0.0, offset as f64, 0.0));
        };
        if offset <= ON_POS_OFFSET {
            return support;
        }
        if offset as f64 <= 0.5 && world.block_at(support).tall_collision {
            return support;
        }
        IVec3::new(support.x, floor_i32(self.position().y - offset as f64), support.z)
    }

    /// Horizontal velocity multiplier of the ground under the entity.
    pub fn block_speed_factor(&self, world: &dyn CollisionWorld) -> f32 {
        self.block_factor(world, |def| def.speed_factor)
    }

    /// Jump strength multiplier of the ground under the entity.
    pub fn block_jump_factor(&self, world: &dyn CollisionWorld) -> f32 {
        self.block_factor(world, |def| def.jump_factor)
    }

    /// The block at the feet decides, unless it is neutral (factor 1.0); then
    /// the block below that affects movement decides. Water always decides.
    fn block_factor(&self, world: &dyn CollisionWorld, factor: impl Fn(&BlockDef) -> f32) -> f32 {
        let feet = world.block_at(self.block_position());
        let own = factor(feet);
        if feet.is_fluid(FluidKind::Water) || own != 1.0 {
            return own;
        }
        factor(world.block_at(self.block_pos_below_that_affects_my_movement(world)))
    }
}

/// The colliding block in `probe` closest to `position`. Equally close blocks
/// are ordered by Y, then Z, then X, and the greatest wins.
pub fn find_supporting_block(
    world: &dyn CollisionWorld,
    position: DVec3,
    probe: &Aabb,
) -> Option<IVec3> {
    let mut best: Option<(IVec3, f64)> = None;
    for collision in world.block_collisions(probe) {
        let pos = collision.pos;
        let distance = (pos.as_dvec3() + DVec3::splat(0.5)).distance_squared(position);
        let better = match best {
            None => true,
            Some((best_pos, best_distance)) => {
                distance < best_distance
                    || (distance == best_distance
                        && (pos.y, pos.z, pos.x) > (best_pos.y, best_pos.z, best_pos.x))
            }
        };
        if better {
            best = Some((pos, distance));
        }
    }
    best.map(|(pos, _)| pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Dimensions, MovementTraits};
    use strata_voxel::{BlockTypeRegistry, BlockWorld, CollisionKind};

    struct Fixture {
        world: BlockWorld,
        stone: strata_voxel::BlockId,
        fence: strata_voxel::BlockId,
        soul_sand: strata_voxel::BlockId,
    }

    fn fixture() -> Fixture {
        let mut registry = BlockTypeRegistry::new();
        let stone = registry.register(BlockDef::solid("stone")).unwrap();
        let fence = registry
            .register(BlockDef {
                collision: CollisionKind::Box {
                    min: [0.375, 0.0, 0.375],
                    max: [0.625, 1.5, 0.625],
                },
                tall_collision: true,
                ..BlockDef::solid("fence")
            })
            .unwrap();
        let soul_sand = registry
            .register(BlockDef {
                speed_factor: 0.4,
                jump_factor: 0.5,
                ..BlockDef::solid("soul_sand")
            })
            .unwrap();
        let mut world = BlockWorld::new(registry);
        world.load_area(IVec3::new(-16, 0, -16), IVec3::new(31, 0, 31));
        Fixture {
            world,
            stone,
            fence,
            soul_sand,
        }
    }

    fn standing_at(x: f64, y: f64, z: f64) -> EntityCore {
        EntityCore::new(
            1,
            DVec3::new(x, y, z),
            Dimensions::scalable(0.6, 1.8),
            MovementTraits::walker(0.6),
        )
    }

    #[test]
    fn test_supporting_block_is_found_under_feet() {
        let mut f = fixture();
        f.world.set_block(IVec3::new(0, 0, 0), f.stone);
        let mut e = standing_at(0.5, 1.0, 0.5);
        e.set_on_ground_with_known_movement(true, None, &f.world);
        assert!(e.on_ground());
        assert_eq!(e.supporting_block(), Some(IVec3::new(0, 0, 0)));
        assert!(!e.on_ground_no_blocks());
        assert_eq!(e.on_pos(&f.world), IVec3::new(0, 0, 0));
    }

    #[test]
    fn test_closest_block_wins_with_ordered_ties() {
        let mut f = fixture();
        f.world.set_block(IVec3::new(0, 0, 0), f.stone);
        f.world.set_block(IVec3::new(1, 0, 0), f.stone);
        // Straddling both blocks, slightly nearer the second.
        let mut e = standing_at(1.1, 1.0, 0.5);
        e.set_on_ground_with_known_movement(true, None, &f.world);
        assert_eq!(e.supporting_block(), Some(IVec3::new(1, 0, 0)));

        // Exactly between: the greater X wins the tie.
        let mut e = standing_at(1.0, 1.0, 0.5);
        e.set_on_ground_with_known_movement(true, None, &f.world);
        assert_eq!(e.supporting_block(), Some(IVec3::new(1, 0, 0)));

        // Four-way tie on a corner: greatest Z first, then greatest X.
        f.world.set_block(IVec3::new(0, 0, 1), f.stone);
        f.world.set_block(IVec3::new(1, 0, 1), f.stone);
        let mut e = standing_at(1.0, 1.0, 1.0);
        e.set_on_ground_with_known_movement(true, None, &f.world);
        assert_eq!(e.supporting_block(), Some(IVec3::new(1, 0, 1)));
    }

    #[test]
    fn test_retry_uses_previous_position() {
        let mut f = fixture();
        f.world.set_block(IVec3::new(0, 0, 0), f.stone);
        // Just walked off the block towards +X.
        let mut e = standing_at(1.5, 1.0, 0.5);
        e.set_on_ground_with_known_movement(true, Some(DVec3::new(0.4, 0.0, 0.0)), &f.world);
        assert_eq!(e.supporting_block(), Some(IVec3::new(0, 0, 0)));
        assert!(!e.on_ground_no_blocks());
    }

    #[test]
    fn test_no_blocks_flag_and_airborne_clears_cache() {
        let f = fixture();
        let mut e = standing_at(5.5, 1.0, 5.5);
        e.set_on_ground_with_known_movement(true, None, &f.world);
        assert_eq!(e.supporting_block(), None);
        assert!(e.on_ground_no_blocks());

        e.set_on_ground_with_known_movement(false, None, &f.world);
        assert!(!e.on_ground());
        assert!(!e.on_ground_no_blocks());
    }

    #[test]
    fn test_on_pos_without_cache_floors_offset_position() {
        let f = fixture();
        let e = standing_at(2.5, 10.1, -0.5);
        assert_eq!(e.on_pos(&f.world), IVec3::new(2, 10, -1));
        assert_eq!(e.on_pos_legacy(&f.world), IVec3::new(2, 9, -1));
        assert_eq!(e.block_pos_below_that_affects_my_movement(&f.world), IVec3::new(2, 9, -1));
    }

    #[test]
    fn test_tall_support_keeps_cached_position() {
        let mut f = fixture();
        f.world.set_block(IVec3::new(0, 0, 0), f.fence);
        let mut e = standing_at(0.5, 1.5, 0.5);
        e.set_on_ground_with_known_movement(true, None, &f.world);
        assert_eq!(e.supporting_block(), Some(IVec3::new(0, 0, 0)));
        // 0.2 below the feet is the air cell above the fence; the tall
        // support is kept instead.
        assert_eq!(e.on_pos_legacy(&f.world), IVec3::new(0, 0, 0));
        assert_eq!(e.block_pos_below_that_affects_my_movement(&f.world), IVec3::new(0, 0, 0));
    }

    #[test]
    fn test_speed_factor_falls_back_to_block_below() {
        let mut f = fixture();
        f.world.set_block(IVec3::new(0, 0, 0), f.soul_sand);
        let mut e = standing_at(0.5, 1.0, 0.5);
        e.set_on_ground_with_known_movement(true, None, &f.world);
        assert_eq!(e.block_speed_factor(&f.world), 0.4);
        assert_eq!(e.block_jump_factor(&f.world), 0.5);

        let e = standing_at(8.5, 1.0, 8.5);
        assert_eq!(e.block_speed_factor(&f.world), 1.0);
    }
}
