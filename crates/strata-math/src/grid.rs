//! Conversions between continuous world coordinates and the integer block grid.

use glam::{DVec3, IVec3};

/// Chunk edge length in blocks, as a shift amount.
const CHUNK_SHIFT: i32 = 4;

/// Column address of a 16×16 chunk in the block grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// Largest integer not greater than `v`, saturating at the `i32` range.
#[inline]
pub fn floor_i32(v: f64) -> i32 {
    v.floor() as i32
}

/// Smallest integer not less than `v`, saturating at the `i32` range.
#[inline]
pub fn ceil_i32(v: f64) -> i32 {
    v.ceil() as i32
}

/// Block cell containing the given point.
pub fn block_containing(p: DVec3) -> IVec3 {
    IVec3::new(floor_i32(p.x), floor_i32(p.y), floor_i32(p.z))
}

/// Chunk column containing the given block.
pub fn chunk_of(block: IVec3) -> ChunkPos {
    ChunkPos::new(block.x >> CHUNK_SHIFT, block.z >> CHUNK_SHIFT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_containing_negative_coords() {
        let b = block_containing(DVec3::new(-0.5, 0.0, 1.999));
        assert_eq!(b, IVec3::new(-1, 0, 1));
    }

    #[test]
    fn test_chunk_of_uses_arithmetic_shift() {
        assert_eq!(chunk_of(IVec3::new(15, 0, 16)), ChunkPos::new(0, 1));
        assert_eq!(chunk_of(IVec3::new(-1, 70, -16)), ChunkPos::new(-1, -1));
        assert_eq!(chunk_of(IVec3::new(-17, 0, 0)), ChunkPos::new(-2, 0));
    }

    #[test]
    fn test_floor_and_ceil() {
        assert_eq!(floor_i32(2.7), 2);
        assert_eq!(ceil_i32(2.1), 3);
        assert_eq!(floor_i32(-2.1), -3);
        assert_eq!(ceil_i32(-2.7), -2);
        assert_eq!(ceil_i32(3.0), 3);
    }
}
