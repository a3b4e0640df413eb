//! Entity movement and collision resolution against a voxel world.
//!
//! [`EntityCore::move_entity`] is the entry point: it limits machinery pushes,
//! applies stuck-block slowdown and edge avoidance, resolves the displacement
//! against blocks, entities and the world border (stepping up low ledges),
//! then updates grounded state, fall distance, block side effects and
//! movement sounds. Fluids are handled per tick by
//! [`EntityCore::update_in_fluids`]. The [`systems`] module wires all of it
//! into a `bevy_ecs` schedule.

mod collide;
mod edge;
mod effects;
mod entity;
mod error;
mod events;
mod fluid;
mod movement;
mod piston;
mod raycast;
mod step_up;
mod support;
pub mod systems;

pub use collide::{collect_colliders, collide_bounding_box, collide_with_shapes, has_collision};
pub use edge::{EdgeAvoidance, NoEdgeAvoidance, SneakEdgeAvoidance};
pub use effects::{InsideBlockHandler, NoBlockEffects, StandardBlockEffects};
pub use entity::{
    CollisionFlags, Dimensions, EntityCore, MinorCollisionHeading, MovementEmission, MovementTraits,
};
pub use error::{BlockEffectError, LedgerError, MovementError};
pub use events::{GameEventKind, MovementEvent, MovementEventBuffer, MovementSink, SoundKind};
pub use fluid::FluidFlowScales;
pub use movement::{MoveContext, MoverType, TravelParams};
pub use piston::{MAX_PISTON_PUSH, PistonDeltas};
pub use raycast::{CellHit, clip_cells, path_resets_fall};
pub use step_up::candidate_step_heights;
pub use support::find_supporting_block;
pub use systems::{
    BlockEffects, GameTime, Mobile, MoveRequest, MovementEvents, SimRng, SimWorld, Travel,
    Travelling, add_movement_systems, insert_movement_resources,
};
