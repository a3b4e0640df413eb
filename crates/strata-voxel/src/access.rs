//! The read-only world contract the movement engine resolves against.
//!
//! Implementors answer block, fluid, and obstacle queries for a region. All
//! queries are synchronous and must not mutate the world; movement code may
//! call them many times per entity per tick.

use glam::{DVec3, IVec3};
use strata_math::Aabb;

use crate::border::WorldBorder;
use crate::fluid::{self, FluidState};
use crate::registry::BlockDef;
use crate::shape::VoxelShape;

/// Identifies a simulated entity across world queries.
pub type EntityId = u64;

/// A block cell whose collision shape overlaps a queried region.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockCollision {
    /// Block cell coordinates.
    pub pos: IVec3,
    /// Collision shape in world space.
    pub shape: VoxelShape,
}

/// Block, fluid, and obstacle queries consumed by the movement engine.
pub trait CollisionWorld {
    /// Solid block shapes overlapping `region`. Unloaded cells contribute nothing.
    fn block_collisions(&self, region: &Aabb) -> Vec<BlockCollision>;

    /// Boxes of collidable entities overlapping `region`, skipping `exclude`.
    fn entity_collisions(&self, region: &Aabb, exclude: Option<EntityId>) -> Vec<VoxelShape>;

    /// The world border.
    fn world_border(&self) -> &WorldBorder;

    /// Block occupying the cell. Unloaded cells read as air.
    fn block_at(&self, pos: IVec3) -> &BlockDef;

    /// Fluid occupying the cell.
    fn fluid_at(&self, pos: IVec3) -> FluidState;

    /// Returns true if every chunk column between the two block corners is loaded.
    fn has_chunks_at(&self, min: IVec3, max: IVec3) -> bool;

    /// Fluid surface height within the cell.
    fn fluid_height(&self, pos: IVec3) -> f32 {
        fluid::surface_height(self, pos)
    }

    /// Normalized direction the fluid in the cell flows.
    fn fluid_flow(&self, pos: IVec3) -> DVec3 {
        fluid::flow_at(self, pos)
    }

    /// Hot dimensions make lava run faster.
    fn is_ultra_warm(&self) -> bool {
        false
    }
}
