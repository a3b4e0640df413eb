//! The per-entity movement ledger.
//!
//! [`EntityCore`] owns everything the resolver reads and writes across ticks:
//! position, bounding box, velocity, collision flags, the supporting-block
//! cache, fluid heights and piston accumulators. Optional behaviour is
//! described by capability data ([`MovementTraits`], [`MinorCollisionHeading`])
//! rather than by entity subtypes.

use std::sync::Arc;

use glam::{DVec3, IVec3};
use rustc_hash::FxHashMap;
use strata_math::{Aabb, ChunkPos, block_containing, chunk_of};
use strata_voxel::{EntityId, FluidKind};
use tracing::warn;

use crate::edge::{EdgeAvoidance, NoEdgeAvoidance, SneakEdgeAvoidance};
use crate::error::LedgerError;
use crate::piston::PistonDeltas;

/// Size of an entity's collision box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
    /// Set for entities that manage their own box orientation. Their box is
    /// translated with the position instead of being rebuilt.
    pub fixed: bool,
}

impl Dimensions {
    pub fn scalable(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            fixed: false,
        }
    }

    pub fn fixed(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            fixed: true,
        }
    }

    /// Box whose bottom face is centred on `position`.
    pub fn make_bounding_box(&self, position: DVec3) -> Aabb {
        Aabb::from_base(position, self.width as f64, self.height as f64)
    }
}

/// Collision outcome of the last resolved move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionFlags {
    pub on_ground: bool,
    pub horizontal_collision: bool,
    pub vertical_collision: bool,
    pub vertical_collision_below: bool,
    pub minor_horizontal_collision: bool,
}

/// Which movement side effects an entity reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MovementEmission {
    None,
    Sounds,
    Events,
    #[default]
    All,
}

impl MovementEmission {
    pub fn emits_anything(self) -> bool {
        self != MovementEmission::None
    }

    pub fn emits_events(self) -> bool {
        matches!(self, MovementEmission::Events | MovementEmission::All)
    }

    pub fn emits_sounds(self) -> bool {
        matches!(self, MovementEmission::Sounds | MovementEmission::All)
    }
}

/// Capability data that replaces per-type overrides of the resolver.
#[derive(Clone, Debug)]
pub struct MovementTraits {
    /// Highest ledge the entity walks up without jumping. Zero disables step-up.
    pub max_step_height: f32,
    /// Fluid currents push the entity.
    pub pushed_by_fluid: bool,
    /// Fluid push keeps its magnitude instead of being normalized (players).
    pub proportional_fluid_push: bool,
    pub fire_immune: bool,
    /// Ticks of immunity granted after leaving fire.
    pub fire_immune_ticks: i32,
    pub emission: MovementEmission,
    pub edge_avoidance: Arc<dyn EdgeAvoidance>,
}

impl MovementTraits {
    /// Defaults for a walking mob with the given step height.
    pub fn walker(max_step_height: f32) -> Self {
        Self {
            max_step_height,
            ..Self::default()
        }
    }

    /// Defaults for a player: proportional fluid push and sneak edge avoidance.
    pub fn player(max_step_height: f32) -> Self {
        Self {
            max_step_height,
            proportional_fluid_push: true,
            edge_avoidance: Arc::new(SneakEdgeAvoidance),
            ..Self::default()
        }
    }
}

impl Default for MovementTraits {
    fn default() -> Self {
        Self {
            max_step_height: 0.0,
            pushed_by_fluid: true,
            proportional_fluid_push: false,
            fire_immune: false,
            fire_immune_ticks: 1,
            emission: MovementEmission::All,
            edge_avoidance: Arc::new(NoEdgeAvoidance),
        }
    }
}

/// Movement input used to tell a glancing collision from a head-on one.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MinorCollisionHeading {
    /// Sideways input, positive to the left.
    pub strafe: f32,
    /// Forward input.
    pub forward: f32,
}

/// Largest angle between input heading and movement that still counts as a
/// minor collision, in radians.
const MINOR_COLLISION_ANGLE: f64 = 0.139_626_34_f32 as f64;

/// Position, box, velocity and collision state of a simulated entity.
#[derive(Clone, Debug)]
pub struct EntityCore {
    id: EntityId,
    position: DVec3,
    block_position: IVec3,
    chunk_position: ChunkPos,
    bounding_box: Aabb,
    dimensions: Dimensions,
    delta_movement: DVec3,
    y_rot: f32,
    x_rot: f32,
    pub(crate) flags: CollisionFlags,
    pub(crate) supporting_block: Option<IVec3>,
    pub(crate) on_ground_no_blocks: bool,
    pub(crate) fluid_heights: FxHashMap<FluidKind, f64>,
    pub(crate) was_touching_water: bool,
    pub(crate) first_tick: bool,
    pub(crate) piston: PistonDeltas,
    pub(crate) stuck_speed_multiplier: DVec3,
    pub(crate) fall_distance: f32,
    pub(crate) remaining_fire_ticks: i32,
    pub(crate) walk_dist: f32,
    pub(crate) move_dist: f32,
    pub(crate) fly_dist: f32,
    pub(crate) next_step: f32,
    /// Moves bypass collision entirely.
    pub no_physics: bool,
    pub sneaking: bool,
    pub traits: MovementTraits,
    pub heading: Option<MinorCollisionHeading>,
}

impl EntityCore {
    /// Creates an entity at rest with its box built from `dimensions`.
    pub fn new(
        id: EntityId,
        position: DVec3,
        dimensions: Dimensions,
        traits: MovementTraits,
    ) -> Self {
        let block_position = block_containing(position);
        Self {
            id,
            position,
            block_position,
            chunk_position: chunk_of(block_position),
            bounding_box: dimensions.make_bounding_box(position),
            dimensions,
            delta_movement: DVec3::ZERO,
            y_rot: 0.0,
            x_rot: 0.0,
            flags: CollisionFlags::default(),
            supporting_block: None,
            on_ground_no_blocks: false,
            fluid_heights: FxHashMap::default(),
            was_touching_water: false,
            first_tick: true,
            piston: PistonDeltas::default(),
            stuck_speed_multiplier: DVec3::ZERO,
            fall_distance: 0.0,
            remaining_fire_ticks: -traits.fire_immune_ticks,
            walk_dist: 0.0,
            move_dist: 0.0,
            fly_dist: 0.0,
            next_step: 1.0,
            no_physics: false,
            sneaking: false,
            traits,
            heading: None,
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn block_position(&self) -> IVec3 {
        self.block_position
    }

    pub fn chunk_position(&self) -> ChunkPos {
        self.chunk_position
    }

    pub fn bounding_box(&self) -> &Aabb {
        &self.bounding_box
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn delta_movement(&self) -> DVec3 {
        self.delta_movement
    }

    pub fn set_delta_movement(&mut self, velocity: DVec3) {
        self.delta_movement = velocity;
    }

    pub fn flags(&self) -> CollisionFlags {
        self.flags
    }

    pub fn on_ground(&self) -> bool {
        self.flags.on_ground
    }

    pub fn supporting_block(&self) -> Option<IVec3> {
        self.supporting_block
    }

    pub fn on_ground_no_blocks(&self) -> bool {
        self.on_ground_no_blocks
    }

    /// Submersion depth recorded this tick, or 0.
    pub fn fluid_height(&self, kind: FluidKind) -> f64 {
        self.fluid_heights.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn is_in_water(&self) -> bool {
        self.was_touching_water
    }

    pub fn is_in_lava(&self) -> bool {
        self.fluid_height(FluidKind::Lava) > 0.0
    }

    pub fn fall_distance(&self) -> f32 {
        self.fall_distance
    }

    pub fn set_fall_distance(&mut self, fall_distance: f32) {
        self.fall_distance = fall_distance;
    }

    pub fn reset_fall_distance(&mut self) {
        self.fall_distance = 0.0;
    }

    pub fn remaining_fire_ticks(&self) -> i32 {
        self.remaining_fire_ticks
    }

    pub fn set_remaining_fire_ticks(&mut self, ticks: i32) {
        self.remaining_fire_ticks = ticks;
    }

    pub fn is_on_fire(&self) -> bool {
        !self.traits.fire_immune && self.remaining_fire_ticks > 0
    }

    pub fn clear_fire(&mut self) {
        self.remaining_fire_ticks = 0;
    }

    pub fn stuck_speed_multiplier(&self) -> DVec3 {
        self.stuck_speed_multiplier
    }

    /// Slows the next move by `multiplier` per axis and cancels the fall.
    pub fn make_stuck_in_block(&mut self, multiplier: DVec3) {
        self.reset_fall_distance();
        self.stuck_speed_multiplier = multiplier;
    }

    pub fn walk_dist(&self) -> f32 {
        self.walk_dist
    }

    pub fn move_dist(&self) -> f32 {
        self.move_dist
    }

    pub fn fly_dist(&self) -> f32 {
        self.fly_dist
    }

    pub fn y_rot(&self) -> f32 {
        self.y_rot
    }

    pub fn x_rot(&self) -> f32 {
        self.x_rot
    }

    // -- ledger writes ------------------------------------------------------

    /// Moves the entity and rebuilds its box. Non-finite positions are
    /// logged and discarded.
    pub fn set_pos(&mut self, position: DVec3) {
        if let Err(err) = self.set_pos_raw(position, true) {
            warn!(entity = self.id, %err, "Discarding invalid entity position");
        }
    }

    /// Writes the position. The box is rebuilt from the dimensions when the
    /// position changed or `force_box_rebuild` is set; fixed-size entities
    /// have their box translated instead.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NonFinite`] and leaves the ledger untouched if
    /// any coordinate is NaN or infinite.
    pub fn set_pos_raw(
        &mut self,
        position: DVec3,
        force_box_rebuild: bool,
    ) -> Result<(), LedgerError> {
        if !position.is_finite() {
            return Err(LedgerError::NonFinite {
                x: position.x,
                y: position.y,
                z: position.z,
            });
        }
        let previous = self.position;
        let changed = position != previous;
        if changed {
            self.position = position;
            let block = block_containing(position);
            if block != self.block_position {
                self.block_position = block;
                let chunk = chunk_of(block);
                if chunk != self.chunk_position {
                    self.chunk_position = chunk;
                }
            }
            self.supporting_block = None;
        }
        if self.dimensions.fixed {
            if changed {
                self.bounding_box = self.bounding_box.move_by(position - previous);
            }
        } else if changed || force_box_rebuild {
            self.bounding_box = self.dimensions.make_bounding_box(position);
        }
        Ok(())
    }

    /// Replaces the box. Spans are clamped to [`strata_math::MAX_BOX_SPAN`].
    pub fn set_bounding_box(&mut self, aabb: Aabb) {
        self.bounding_box = aabb.clamp_span();
    }

    /// Changes the dimensions and rebuilds the box around the current position.
    pub fn set_dimensions(&mut self, dimensions: Dimensions) {
        self.dimensions = dimensions;
        self.bounding_box = dimensions.make_bounding_box(self.position);
    }

    /// Sets the yaw. Non-finite angles are logged and discarded.
    pub fn set_y_rot(&mut self, y_rot: f32) {
        if let Err(err) = self.try_set_y_rot(y_rot) {
            warn!(entity = self.id, %err, "Discarding invalid entity rotation");
        }
    }

    /// Sets the pitch. Non-finite angles are logged and discarded.
    pub fn set_x_rot(&mut self, x_rot: f32) {
        if let Err(err) = self.try_set_x_rot(x_rot) {
            warn!(entity = self.id, %err, "Discarding invalid entity rotation");
        }
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::NonFiniteRotation`] and keeps the old yaw if
    /// `y_rot` is NaN or infinite.
    pub fn try_set_y_rot(&mut self, y_rot: f32) -> Result<(), LedgerError> {
        self.y_rot = finite_rotation(y_rot)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::NonFiniteRotation`] and keeps the old pitch if
    /// `x_rot` is NaN or infinite.
    pub fn try_set_x_rot(&mut self, x_rot: f32) -> Result<(), LedgerError> {
        self.x_rot = finite_rotation(x_rot)?;
        Ok(())
    }

    /// Moves by a piston push, clamped so no axis exceeds the per-tick budget.
    pub fn limit_piston_movement(&mut self, displacement: DVec3, game_time: u64) -> DVec3 {
        self.piston.limit(displacement, game_time)
    }

    /// Returns true when the entity's input heading is within a narrow cone of
    /// `movement`, so the collision only grazed it. Entities without a heading
    /// never report minor collisions.
    pub fn is_horizontal_collision_minor(&self, movement: DVec3) -> bool {
        let Some(heading) = self.heading else {
            return false;
        };
        let yaw = self.y_rot.to_radians();
        let (sin, cos) = (yaw.sin() as f64, yaw.cos() as f64);
        let (strafe, forward) = (heading.strafe as f64, heading.forward as f64);
        let hx = strafe * cos - forward * sin;
        let hz = forward * cos + strafe * sin;
        let heading_sq = hx * hx + hz * hz;
        let movement_sq = movement.x * movement.x + movement.z * movement.z;
        if heading_sq < 1.0e-5_f32 as f64 || movement_sq < 1.0e-5_f32 as f64 {
            return false;
        }
        let dot = hx * movement.x + hz * movement.z;
        (dot / (heading_sq * movement_sq).sqrt()).acos() < MINOR_COLLISION_ANGLE
    }
}

fn finite_rotation(angle: f32) -> Result<f32, LedgerError> {
    if angle.is_finite() {
        Ok(angle)
    } else {
        Err(LedgerError::NonFiniteRotation(angle))
    }
}
