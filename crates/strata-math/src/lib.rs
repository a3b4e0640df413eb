//! Double-precision collision boxes, axis helpers, and block-grid coordinate math for Strata.

mod aabb;
mod axis;
mod grid;
mod vector;

pub use aabb::{Aabb, MAX_BOX_SPAN};
pub use axis::Axis;
pub use grid::{ChunkPos, block_containing, ceil_i32, chunk_of, floor_i32};
pub use vector::{horizontal_distance_sqr, normalize_or_zero};
