//! Fluid cell state, surface heights, and flow direction.
//!
//! A fluid cell has a level from 1 to 8 (8 is a source) and a falling flag.
//! Flow points from higher cells toward lower or empty neighbours and is what
//! pushes entities along a current.

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};
use strata_math::normalize_or_zero;

use crate::access::CollisionWorld;

/// Fluid category. Each category keeps its own submersion depth per entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FluidKind {
    Water,
    Lava,
}

/// Level of a source cell.
pub const SOURCE_LEVEL: u8 = 8;

/// Height a cell surface drops when draining into an empty cell below its
/// neighbour.
const DROP_OFF_HEIGHT: f32 = 0.888_888_9;

/// Downward pull added to falling fluid that runs beside a wall.
const FALLING_PULL: f64 = -6.0;

/// Fluid contents of a single block cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FluidState {
    /// Fluid category, or `None` for an empty cell.
    pub kind: Option<FluidKind>,
    /// Level in `1..=8`; 0 for empty cells.
    pub amount: u8,
    /// Set for fluid pouring down from the cell above.
    pub falling: bool,
}

impl FluidState {
    /// Cell with no fluid.
    pub const EMPTY: FluidState = FluidState {
        kind: None,
        amount: 0,
        falling: false,
    };

    /// Full source cell of the given fluid.
    pub fn source(kind: FluidKind) -> Self {
        Self {
            kind: Some(kind),
            amount: SOURCE_LEVEL,
            falling: false,
        }
    }

    /// Flowing cell. `amount` is clamped to `1..=8`.
    pub fn flowing(kind: FluidKind, amount: u8, falling: bool) -> Self {
        Self {
            kind: Some(kind),
            amount: amount.clamp(1, SOURCE_LEVEL),
            falling,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
    }

    pub fn is(&self, kind: FluidKind) -> bool {
        self.kind == Some(kind)
    }

    pub fn is_source(&self) -> bool {
        self.kind.is_some() && self.amount == SOURCE_LEVEL && !self.falling
    }

    /// Surface height within the cell, ignoring the cell above.
    pub fn own_height(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.amount as f32 / 9.0
        }
    }

    /// True if `other` takes part in this fluid's flow computation: empty
    /// cells and cells of the same fluid.
    fn affects_flow(&self, other: &FluidState) -> bool {
        other.is_empty() || other.kind == self.kind
    }
}

/// Surface height of the fluid at `pos`, relative to the cell bottom.
///
/// A cell covered by the same fluid is full to the brim.
pub fn surface_height<W: CollisionWorld + ?Sized>(world: &W, pos: IVec3) -> f32 {
    let state = world.fluid_at(pos);
    if state.is_empty() {
        return 0.0;
    }
    let above = world.fluid_at(pos + IVec3::Y);
    if above.kind == state.kind {
        1.0
    } else {
        state.own_height()
    }
}

/// Normalized flow direction of the fluid at `pos`.
///
/// Each horizontal neighbour contributes the height difference toward it.
/// An empty, passable neighbour contributes the difference toward the fluid
/// one cell below it, so currents run toward drop-offs.
pub fn flow_at<W: CollisionWorld + ?Sized>(world: &W, pos: IVec3) -> DVec3 {
    let state = world.fluid_at(pos);
    if state.is_empty() {
        return DVec3::ZERO;
    }
    let own = state.own_height();
    let mut dx = 0.0_f64;
    let mut dz = 0.0_f64;

    for step in HORIZONTAL {
        let side = pos + step;
        let neighbour = world.fluid_at(side);
        if !state.affects_flow(&neighbour) {
            continue;
        }
        let mut height = neighbour.own_height();
        let mut diff = 0.0_f32;
        if height == 0.0 {
            if !world.block_at(side).blocks_motion() {
                let below = world.fluid_at(side - IVec3::Y);
                if state.affects_flow(&below) {
                    height = below.own_height();
                    if height > 0.0 {
                        diff = own - (height - DROP_OFF_HEIGHT);
                    }
                }
            }
        } else if height > 0.0 {
            diff = own - height;
        }
        if diff != 0.0 {
            dx += step.x as f64 * diff as f64;
            dz += step.z as f64 * diff as f64;
        }
    }

    let mut flow = DVec3::new(dx, 0.0, dz);
    if state.falling {
        let beside_wall = HORIZONTAL.iter().any(|step| {
            world.block_at(pos + *step).blocks_motion()
                || world.block_at(pos + *step + IVec3::Y).blocks_motion()
        });
        if beside_wall {
            flow = normalize_or_zero(flow) + DVec3::new(0.0, FALLING_PULL, 0.0);
        }
    }
    normalize_or_zero(flow)
}

const HORIZONTAL: [IVec3; 4] = [
    IVec3::new(0, 0, -1),
    IVec3::new(0, 0, 1),
    IVec3::new(-1, 0, 0),
    IVec3::new(1, 0, 0),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BlockDef, BlockTypeRegistry};
    use crate::world::BlockWorld;
    use strata_math::ChunkPos;

    fn water_world() -> BlockWorld {
        let mut registry = BlockTypeRegistry::new();
        registry.register(BlockDef::solid("stone")).unwrap();
        registry
            .register(BlockDef {
                fluid: Some(FluidKind::Water),
                ..BlockDef::passable("water")
            })
            .unwrap();
        let mut world = BlockWorld::new(registry);
        world.load_chunk(ChunkPos::new(0, 0));
        world
    }

    #[test]
    fn test_own_height_scales_with_level() {
        assert_eq!(FluidState::EMPTY.own_height(), 0.0);
        assert!((FluidState::source(FluidKind::Water).own_height() - 8.0 / 9.0).abs() < 1e-6);
        let state = FluidState::flowing(FluidKind::Water, 4, false);
        assert!((state.own_height() - 4.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_flowing_amount_is_clamped() {
        assert_eq!(FluidState::flowing(FluidKind::Lava, 0, false).amount, 1);
        assert_eq!(FluidState::flowing(FluidKind::Lava, 20, false).amount, SOURCE_LEVEL);
    }

    #[test]
    fn test_surface_full_under_same_fluid() {
        let mut world = water_world();
        world.set_fluid(IVec3::new(1, 1, 1), FluidState::source(FluidKind::Water));
        world.set_fluid(IVec3::new(1, 2, 1), FluidState::source(FluidKind::Water));
        assert_eq!(surface_height(&world, IVec3::new(1, 1, 1)), 1.0);
        assert!(surface_height(&world, IVec3::new(1, 2, 1)) < 1.0);
    }

    #[test]
    fn test_flow_runs_toward_lower_neighbour() {
        let mut world = water_world();
        world.set_fluid(IVec3::new(4, 1, 4), FluidState::source(FluidKind::Water));
        world.set_fluid(IVec3::new(5, 1, 4), FluidState::flowing(FluidKind::Water, 7, false));
        // Walls on every other side keep the flow purely eastward.
        let stone = world.registry().lookup_by_name("stone").unwrap();
        world.set_block(IVec3::new(3, 1, 4), stone);
        world.set_block(IVec3::new(4, 1, 3), stone);
        world.set_block(IVec3::new(4, 1, 5), stone);

        let flow = flow_at(&world, IVec3::new(4, 1, 4));
        assert!((flow.x - 1.0).abs() < 1e-9, "flow={flow:?}");
        assert_eq!(flow.z, 0.0);
    }

    #[test]
    fn test_still_pool_has_no_flow() {
        let mut world = water_world();
        for x in 0..3 {
            for z in 0..3 {
                world.set_fluid(IVec3::new(x, 1, z), FluidState::source(FluidKind::Water));
            }
        }
        let stone = world.registry().lookup_by_name("stone").unwrap();
        for i in -1..4 {
            world.set_block(IVec3::new(i, 1, -1), stone);
            world.set_block(IVec3::new(i, 1, 3), stone);
            world.set_block(IVec3::new(-1, 1, i), stone);
            world.set_block(IVec3::new(3, 1, i), stone);
        }
        assert_eq!(flow_at(&world, IVec3::new(1, 1, 1)), DVec3::ZERO);
    }

    #[test]
    fn test_empty_cell_has_no_flow() {
        let world = water_world();
        assert_eq!(flow_at(&world, IVec3::new(2, 2, 2)), DVec3::ZERO);
    }
}
