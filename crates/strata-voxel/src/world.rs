//! In-memory block world: the reference [`CollisionWorld`] implementation.
//!
//! Owns loaded chunk columns keyed by [`ChunkPos`], the block registry, the
//! world border, and the boxes of collidable entities (boats, shulkers and
//! similar) that other entities bump into.

use glam::IVec3;
use rustc_hash::FxHashMap;
use strata_math::{Aabb, ChunkPos, chunk_of, floor_i32};

use crate::access::{BlockCollision, CollisionWorld, EntityId};
use crate::border::WorldBorder;
use crate::chunk::Chunk;
use crate::fluid::{FluidKind, FluidState};
use crate::registry::{BlockDef, BlockId, BlockTypeRegistry};
use crate::shape::{COLLISION_EPSILON, VoxelShape};

/// Chunk-backed block world with entity obstacles and a border.
pub struct BlockWorld {
    registry: BlockTypeRegistry,
    chunks: FxHashMap<ChunkPos, Chunk>,
    border: WorldBorder,
    entity_boxes: FxHashMap<EntityId, Aabb>,
    ultra_warm: bool,
}

impl BlockWorld {
    /// Creates an empty world with no loaded chunks.
    pub fn new(registry: BlockTypeRegistry) -> Self {
        Self {
            registry,
            chunks: FxHashMap::default(),
            border: WorldBorder::default(),
            entity_boxes: FxHashMap::default(),
            ultra_warm: false,
        }
    }

    pub fn registry(&self) -> &BlockTypeRegistry {
        &self.registry
    }

    /// Loads an empty column. Reloading an existing column keeps its blocks.
    pub fn load_chunk(&mut self, pos: ChunkPos) {
        self.chunks.entry(pos).or_default();
    }

    /// Loads every column overlapping the block range `[min, max]` on X/Z.
    pub fn load_area(&mut self, min: IVec3, max: IVec3) {
        let (a, b) = (chunk_of(min), chunk_of(max));
        for cx in a.x..=b.x {
            for cz in a.z..=b.z {
                self.load_chunk(ChunkPos::new(cx, cz));
            }
        }
    }

    /// Removes and returns the column at the given position.
    pub fn unload_chunk(&mut self, pos: ChunkPos) -> Option<Chunk> {
        self.chunks.remove(&pos)
    }

    pub fn is_loaded(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    /// Number of currently loaded columns.
    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// Returns the block ID at a cell, or air if unloaded.
    pub fn block_id(&self, pos: IVec3) -> BlockId {
        let (x, z) = local(pos);
        self.chunks
            .get(&chunk_of(pos))
            .map_or(BlockId(0), |chunk| chunk.block(x, pos.y, z))
    }

    /// Sets a block. Returns `false` if the column is not loaded.
    pub fn set_block(&mut self, pos: IVec3, block: BlockId) -> bool {
        let (x, z) = local(pos);
        match self.chunks.get_mut(&chunk_of(pos)) {
            Some(chunk) => {
                chunk.set_block(x, pos.y, z, block);
                true
            }
            None => false,
        }
    }

    /// Fills the inclusive block range with one block type.
    pub fn fill(&mut self, min: IVec3, max: IVec3, block: BlockId) {
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    self.set_block(IVec3::new(x, y, z), block);
                }
            }
        }
    }

    /// Places fluid in a cell using the registry's block for that fluid.
    /// An empty state clears the cell to air.
    ///
    /// Returns `false` if the column is not loaded or no block is registered
    /// for the fluid.
    pub fn set_fluid(&mut self, pos: IVec3, state: FluidState) -> bool {
        let Some(kind) = state.kind else {
            return self.set_block(pos, BlockId(0));
        };
        let Some(block) = self.registry.fluid_block(kind) else {
            tracing::warn!("No block registered for fluid {:?}", kind);
            return false;
        };
        let (x, z) = local(pos);
        match self.chunks.get_mut(&chunk_of(pos)) {
            Some(chunk) => {
                chunk.set_fluid(x, pos.y, z, block, state);
                true
            }
            None => false,
        }
    }

    /// Registers or moves a collidable entity box.
    pub fn set_entity_box(&mut self, id: EntityId, aabb: Aabb) {
        self.entity_boxes.insert(id, aabb);
    }

    pub fn remove_entity_box(&mut self, id: EntityId) -> Option<Aabb> {
        self.entity_boxes.remove(&id)
    }

    pub fn set_border(&mut self, border: WorldBorder) {
        self.border = border;
    }

    pub fn set_ultra_warm(&mut self, ultra_warm: bool) {
        self.ultra_warm = ultra_warm;
    }
}

impl CollisionWorld for BlockWorld {
    fn block_collisions(&self, region: &Aabb) -> Vec<BlockCollision> {
        // One extra cell in every direction picks up shapes taller than their
        // cell, such as fences.
        let min_x = floor_i32(region.min.x - COLLISION_EPSILON) - 1;
        let max_x = floor_i32(region.max.x + COLLISION_EPSILON) + 1;
        let min_y = floor_i32(region.min.y - COLLISION_EPSILON) - 1;
        let max_y = floor_i32(region.max.y + COLLISION_EPSILON) + 1;
        let min_z = floor_i32(region.min.z - COLLISION_EPSILON) - 1;
        let max_z = floor_i32(region.max.z + COLLISION_EPSILON) + 1;

        let mut out = Vec::new();
        for z in min_z..=max_z {
            for x in min_x..=max_x {
                let column = IVec3::new(x, 0, z);
                let Some(chunk) = self.chunks.get(&chunk_of(column)) else {
                    continue;
                };
                let (lx, lz) = local(column);
                for y in min_y..=max_y {
                    let id = chunk.block(lx, y, lz);
                    if id.0 == 0 {
                        continue;
                    }
                    let shape = self.registry.shape(id);
                    if shape.is_empty() {
                        continue;
                    }
                    let pos = IVec3::new(x, y, z);
                    let placed = shape.at_block(pos);
                    if placed.intersects(region) {
                        out.push(BlockCollision { pos, shape: placed });
                    }
                }
            }
        }
        out
    }

    fn entity_collisions(&self, region: &Aabb, exclude: Option<EntityId>) -> Vec<VoxelShape> {
        let size = region.size();
        if size.x.max(size.y).max(size.z) < COLLISION_EPSILON {
            return Vec::new();
        }
        let grown = region.inflate(COLLISION_EPSILON);
        self.entity_boxes
            .iter()
            .filter(|(id, aabb)| Some(**id) != exclude && aabb.intersects(&grown))
            .map(|(_, aabb)| VoxelShape::from_box(*aabb))
            .collect()
    }

    fn world_border(&self) -> &WorldBorder {
        &self.border
    }

    fn block_at(&self, pos: IVec3) -> &BlockDef {
        self.registry.get(self.block_id(pos))
    }

    fn fluid_at(&self, pos: IVec3) -> FluidState {
        let (x, z) = local(pos);
        let Some(chunk) = self.chunks.get(&chunk_of(pos)) else {
            return FluidState::EMPTY;
        };
        let def = self.registry.get(chunk.block(x, pos.y, z));
        chunk.fluid(x, pos.y, z, def.fluid)
    }

    fn has_chunks_at(&self, min: IVec3, max: IVec3) -> bool {
        let (a, b) = (chunk_of(min), chunk_of(max));
        (a.x..=b.x).all(|cx| (a.z..=b.z).all(|cz| self.is_loaded(ChunkPos::new(cx, cz))))
    }

    fn is_ultra_warm(&self) -> bool {
        self.ultra_warm
    }
}

/// Column-local X/Z of a block position.
fn local(pos: IVec3) -> (u8, u8) {
    (pos.x.rem_euclid(16) as u8, pos.z.rem_euclid(16) as u8)
}

/// Convenience for tests and demos: a water block definition.
pub fn water_block() -> BlockDef {
    BlockDef {
        fluid: Some(FluidKind::Water),
        ..BlockDef::passable("water")
    }
}

/// Convenience for tests and demos: a lava block definition.
pub fn lava_block() -> BlockDef {
    BlockDef {
        fluid: Some(FluidKind::Lava),
        ignites: true,
        ..BlockDef::passable("lava")
    }
}
