//! Chunk column storage: 16×16 block columns split into lazily allocated
//! 16×16×16 sections holding block IDs and fluid levels.

use rustc_hash::FxHashMap;

use crate::fluid::{FluidKind, FluidState};
use crate::registry::BlockId;

/// Edge length of a chunk section in blocks.
pub const SECTION_SIZE: usize = 16;
/// Number of cells in a section.
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;

const FALLING_BIT: u8 = 0b1000_0000;
const AMOUNT_MASK: u8 = 0b0000_1111;

/// One 16³ slice of a column.
#[derive(Clone, Debug)]
struct Section {
    blocks: Box<[BlockId; SECTION_VOLUME]>,
    /// Packed fluid level (low nibble) and falling flag (high bit).
    fluid_levels: Box<[u8; SECTION_VOLUME]>,
    /// Number of non-air cells, for dropping empty sections.
    non_air: u16,
}

impl Section {
    fn new() -> Self {
        Self {
            blocks: Box::new([BlockId(0); SECTION_VOLUME]),
            fluid_levels: Box::new([0; SECTION_VOLUME]),
            non_air: 0,
        }
    }
}

#[inline]
fn index(x: usize, y: usize, z: usize) -> usize {
    (y * SECTION_SIZE + z) * SECTION_SIZE + x
}

/// A loaded 16-wide column of the world with unbounded height.
///
/// Local X/Z must be in `[0, 16)`; Y is a world coordinate. Missing sections
/// read as air.
#[derive(Clone, Debug, Default)]
pub struct Chunk {
    sections: FxHashMap<i32, Section>,
}

impl Chunk {
    /// Creates a column filled with air.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the block at local `(x, z)` and world `y`.
    pub fn block(&self, x: u8, y: i32, z: u8) -> BlockId {
        let Some((section, i)) = self.locate(x, y, z) else {
            return BlockId(0);
        };
        section.blocks[i]
    }

    /// Sets the block at local `(x, z)` and world `y`, clearing its fluid.
    pub fn set_block(&mut self, x: u8, y: i32, z: u8, block: BlockId) {
        self.write(x, y, z, block, 0);
    }

    /// Returns the packed fluid level stored at the cell, combined with the
    /// fluid kind of the block occupying it.
    pub fn fluid(&self, x: u8, y: i32, z: u8, kind: Option<FluidKind>) -> FluidState {
        let Some(kind) = kind else {
            return FluidState::EMPTY;
        };
        let Some((section, i)) = self.locate(x, y, z) else {
            return FluidState::EMPTY;
        };
        let packed = section.fluid_levels[i];
        FluidState {
            kind: Some(kind),
            amount: packed & AMOUNT_MASK,
            falling: packed & FALLING_BIT != 0,
        }
    }

    /// Stores a fluid block and its level.
    pub fn set_fluid(&mut self, x: u8, y: i32, z: u8, block: BlockId, state: FluidState) {
        let mut packed = state.amount & AMOUNT_MASK;
        if state.falling {
            packed |= FALLING_BIT;
        }
        self.write(x, y, z, block, packed);
    }

    /// Number of allocated sections.
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    fn locate(&self, x: u8, y: i32, z: u8) -> Option<(&Section, usize)> {
        if x as usize >= SECTION_SIZE || z as usize >= SECTION_SIZE {
            tracing::warn!("Chunk access out of bounds: ({}, {}, {})", x, y, z);
            return None;
        }
        let section = self.sections.get(&y.div_euclid(SECTION_SIZE as i32))?;
        let ly = y.rem_euclid(SECTION_SIZE as i32) as usize;
        Some((section, index(x as usize, ly, z as usize)))
    }

    fn write(&mut self, x: u8, y: i32, z: u8, block: BlockId, packed_fluid: u8) {
        if x as usize >= SECTION_SIZE || z as usize >= SECTION_SIZE {
            tracing::warn!("Chunk write out of bounds: ({}, {}, {})", x, y, z);
            return;
        }
        let sy = y.div_euclid(SECTION_SIZE as i32);
        let i = index(x as usize, y.rem_euclid(SECTION_SIZE as i32) as usize, z as usize);
        if block.0 == 0 && !self.sections.contains_key(&sy) {
            return;
        }
        let section = self.sections.entry(sy).or_insert_with(Section::new);
        let was_air = section.blocks[i].0 == 0;
        section.blocks[i] = block;
        section.fluid_levels[i] = packed_fluid;
        match (was_air, block.0 == 0) {
            (true, false) => section.non_air += 1,
            (false, true) => section.non_air -= 1,
            _ => {}
        }
        if section.non_air == 0 {
            self.sections.remove(&sy);
        }
    }
}
