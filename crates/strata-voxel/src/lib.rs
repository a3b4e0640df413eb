//! Block world model for collision: voxel shapes, block registry, fluids,
//! chunk storage, the world border, and the [`CollisionWorld`] query trait.

pub mod access;
pub mod border;
pub mod chunk;
pub mod fluid;
pub mod registry;
pub mod shape;
pub mod world;

pub use access::{BlockCollision, CollisionWorld, EntityId};
pub use border::WorldBorder;
pub use chunk::Chunk;
pub use fluid::{FluidKind, FluidState};
pub use registry::{BlockDef, BlockId, BlockTypeRegistry, CollisionKind, RegistryError};
pub use shape::{COLLISION_EPSILON, VoxelShape, shapes_collide};
pub use world::{BlockWorld, lava_block, water_block};
