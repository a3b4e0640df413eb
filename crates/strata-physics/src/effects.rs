//! Side effects of blocks an entity's box overlaps after moving.

use glam::{DVec3, IVec3};
use strata_voxel::BlockDef;

use crate::entity::EntityCore;
use crate::error::BlockEffectError;

/// Ticks an entity burns after touching fire.
const FIRE_TICKS_ON_IGNITE: i32 = 160;

/// Applies a block's effect to an entity overlapping it.
pub trait InsideBlockHandler {
    /// Called once per overlapped cell, in X, Y, Z scan order.
    ///
    /// # Errors
    ///
    /// A failure aborts the entity's move and is reported to the caller as a
    /// fatal [`MovementError::InsideBlock`](crate::MovementError::InsideBlock).
    fn entity_inside(
        &mut self,
        pos: IVec3,
        block: &BlockDef,
        entity: &mut EntityCore,
    ) -> Result<(), BlockEffectError>;
}

/// Ignores every block.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBlockEffects;

impl InsideBlockHandler for NoBlockEffects {
    fn entity_inside(
        &mut self,
        _: IVec3,
        _: &BlockDef,
        _: &mut EntityCore,
    ) -> Result<(), BlockEffectError> {
        Ok(())
    }
}

/// Built-in effects: slowing blocks catch the entity and burning blocks set
/// it alight.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardBlockEffects;

impl InsideBlockHandler for StandardBlockEffects {
    fn entity_inside(
        &mut self,
        pos: IVec3,
        block: &BlockDef,
        entity: &mut EntityCore,
    ) -> Result<(), BlockEffectError> {
        if let Some(multiplier) = block.stuck_speed {
            if multiplier.iter().any(|m| !m.is_finite() || *m < 0.0) {
                return Err(BlockEffectError::InvalidState {
                    block: block.name.clone(),
                    pos,
                });
            }
            entity.make_stuck_in_block(DVec3::from_array(multiplier));
        }
        if block.ignites && !entity.traits.fire_immune {
            let ticks = entity.remaining_fire_ticks() + 1;
            entity.set_remaining_fire_ticks(ticks);
            if ticks == 0 {
                entity.set_remaining_fire_ticks(FIRE_TICKS_ON_IGNITE);
            }
        }
        Ok(())
    }
}
