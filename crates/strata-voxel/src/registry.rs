//! Block type registry: maps compact [`BlockId`] values to rich [`BlockDef`] metadata.
//!
//! The registry is built once during world setup. Air is always ID 0 so that
//! zero-initialized chunk memory represents empty space. Collision shapes are
//! resolved at registration time so world queries never rebuild them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strata_math::Aabb;
use thiserror::Error;

use crate::fluid::FluidKind;
use crate::shape::VoxelShape;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Compact identifier stored inside every block cell (2 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u16);

/// Collision geometry of a block, in block-local coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CollisionKind {
    /// Entities pass through (air, plants, fluids, fire).
    Empty,
    /// Full unit cube.
    Full,
    /// A single box from `min` to `max` (slabs, fences, carpets).
    Box { min: [f64; 3], max: [f64; 3] },
}

impl CollisionKind {
    /// Bottom slab of the given height.
    pub fn slab(height: f64) -> Self {
        CollisionKind::Box {
            min: [0.0, 0.0, 0.0],
            max: [1.0, height, 1.0],
        }
    }

    /// Builds the block-local collision shape.
    pub fn to_shape(&self) -> VoxelShape {
        match self {
            CollisionKind::Empty => VoxelShape::empty(),
            CollisionKind::Full => VoxelShape::block(),
            CollisionKind::Box { min, max } => VoxelShape::from_box(Aabb::from_bounds(
                min[0], min[1], min[2], max[0], max[1], max[2],
            )),
        }
    }
}

/// Full descriptor for a block type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockDef {
    /// Human-readable name (e.g. "stone", "water", "cobweb").
    pub name: String,
    /// Collision geometry.
    pub collision: CollisionKind,
    /// Fluid this block is made of, if it is a fluid block.
    pub fluid: Option<FluidKind>,
    /// Horizontal velocity multiplier for entities standing in or on it.
    pub speed_factor: f32,
    /// Jump strength multiplier for entities standing on it.
    pub jump_factor: f32,
    /// Sets entities on fire (fire, lava).
    pub ignites: bool,
    /// Entities can climb it (ladders, vines).
    pub climbable: bool,
    /// Passing through it cancels accumulated fall distance.
    pub resets_fall_damage: bool,
    /// Collision extends above the cell (fences, walls).
    pub tall_collision: bool,
    /// Per-axis velocity multiplier applied to entities caught inside it
    /// (cobwebs, berry bushes).
    #[serde(default)]
    pub stuck_speed: Option<[f64; 3]>,
}

impl BlockDef {
    /// A full solid cube with default factors.
    pub fn solid(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collision: CollisionKind::Full,
            fluid: None,
            speed_factor: 1.0,
            jump_factor: 1.0,
            ignites: false,
            climbable: false,
            resets_fall_damage: false,
            tall_collision: false,
            stuck_speed: None,
        }
    }

    /// A block entities pass through, with default factors.
    pub fn passable(name: &str) -> Self {
        Self {
            collision: CollisionKind::Empty,
            ..Self::solid(name)
        }
    }

    /// Returns true for the empty block.
    pub fn is_air(&self) -> bool {
        self.name == "air"
    }

    /// Returns true if this block has any collision volume.
    pub fn blocks_motion(&self) -> bool {
        self.collision != CollisionKind::Empty
    }

    /// Returns true if this block is made of the given fluid.
    pub fn is_fluid(&self, kind: FluidKind) -> bool {
        self.fluid == Some(kind)
    }
}

/// Errors that can occur during block type registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A type with the same name has already been registered.
    #[error("duplicate block type name: {0}")]
    DuplicateName(String),
    /// All 65 535 user-defined slots have been consumed.
    #[error("block type registry is full (max 65536 types)")]
    RegistryFull,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps [`BlockId`] → [`BlockDef`] with O(1) lookup by index and
/// O(1) reverse lookup by name.
pub struct BlockTypeRegistry {
    /// Dense array where `index == BlockId.0`.
    types: Vec<BlockDef>,
    /// Block-local collision shapes, parallel to `types`.
    shapes: Vec<VoxelShape>,
    /// Reverse lookup: name → ID.
    name_to_id: HashMap<String, BlockId>,
}

impl BlockTypeRegistry {
    /// Creates a new registry with Air pre-registered as ID 0.
    pub fn new() -> Self {
        let air = BlockDef::passable("air");

        let mut name_to_id = HashMap::new();
        name_to_id.insert("air".to_string(), BlockId(0));

        Self {
            shapes: vec![air.collision.to_shape()],
            types: vec![air],
            name_to_id,
        }
    }

    /// Registers a new block type and returns its assigned ID.
    ///
    /// IDs are assigned sequentially starting from 1 (0 is Air).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if a type with the same name
    /// already exists, or [`RegistryError::RegistryFull`] if all 65 536 slots
    /// are consumed.
    pub fn register(&mut self, def: BlockDef) -> Result<BlockId, RegistryError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        if self.types.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }

        let id = BlockId(self.types.len() as u16);
        self.name_to_id.insert(def.name.clone(), id);
        self.shapes.push(def.collision.to_shape());
        self.types.push(def);
        Ok(id)
    }

    /// Returns the definition for a given ID, falling back to Air for
    /// unknown IDs.
    pub fn get(&self, id: BlockId) -> &BlockDef {
        self.types.get(id.0 as usize).unwrap_or(&self.types[0])
    }

    /// Returns the block-local collision shape for a given ID.
    pub fn shape(&self, id: BlockId) -> &VoxelShape {
        self.shapes.get(id.0 as usize).unwrap_or(&self.shapes[0])
    }

    /// Returns the ID for a named block type, or `None` if not found.
    pub fn lookup_by_name(&self, name: &str) -> Option<BlockId> {
        self.name_to_id.get(name).copied()
    }

    /// Returns the first registered block made of the given fluid.
    pub fn fluid_block(&self, kind: FluidKind) -> Option<BlockId> {
        self.types
            .iter()
            .position(|def| def.is_fluid(kind))
            .map(|i| BlockId(i as u16))
    }

    /// Returns the total number of registered types (including Air).
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if only Air is registered.
    pub fn is_empty(&self) -> bool {
        self.types.len() <= 1
    }

    /// Returns `true` if the given block type is air (ID 0).
    pub fn is_air(&self, id: BlockId) -> bool {
        id.0 == 0
    }
}

impl Default for BlockTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
