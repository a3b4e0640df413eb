//! The movement entry point: resolves a desired displacement, applies it, and
//! runs the bookkeeping that depends on where the entity ended up.

use glam::{DVec3, IVec3};
use rand::{Rng, RngCore};
use strata_math::{Aabb, block_containing, ceil_i32, floor_i32, horizontal_distance_sqr};
use strata_voxel::{BlockDef, CollisionWorld};
use tracing::{debug, error, trace};

use crate::effects::InsideBlockHandler;
use crate::entity::EntityCore;
use crate::error::MovementError;
use crate::events::{GameEventKind, MovementSink, SoundKind};
use crate::fluid::FluidFlowScales;
use crate::raycast::path_resets_fall;

/// Squared length below which a displacement counts as no movement.
const MOVEMENT_EPSILON: f64 = 1.0e-7;
/// Margin the box is shrunk by before scanning for overlapped blocks.
const INSIDE_BLOCK_MARGIN: f64 = 1.0e-7;
/// Margin the box is shrunk by before looking for fire.
const FIRE_SCAN_MARGIN: f64 = 1.0e-6;
/// Scale from distance travelled to step-sound distance.
const STEP_DISTANCE_SCALE: f32 = 0.6;

const AIR_DRAG: f64 = 0.98;
const AIR_FRICTION: f64 = 0.91;
const GROUND_FRICTION: f64 = 0.6 * 0.91;
const WATER_DRAG: f64 = 0.8;

/// What is moving the entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MoverType {
    /// The entity's own velocity.
    #[default]
    SelfPropelled,
    /// Player input.
    Player,
    /// A piston head.
    Piston,
    /// An opening shulker box lid.
    ShulkerBox,
    /// A shulker shell.
    Shulker,
}

impl MoverType {
    /// Machinery pushes are limited per tick.
    pub fn is_machinery(self) -> bool {
        matches!(self, MoverType::Piston | MoverType::ShulkerBox)
    }
}

/// Everything [`EntityCore::move_entity`] needs besides the entity itself.
pub struct MoveContext<'a> {
    pub world: &'a dyn CollisionWorld,
    pub sink: &'a mut dyn MovementSink,
    pub inside: &'a mut dyn InsideBlockHandler,
    pub rng: &'a mut dyn RngCore,
    pub game_time: u64,
}

/// Constants for the simple travel loop in [`EntityCore::tick_physics`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TravelParams {
    pub gravity: f64,
    pub flow_scales: FluidFlowScales,
}

impl Default for TravelParams {
    fn default() -> Self {
        Self {
            gravity: 0.08,
            flow_scales: FluidFlowScales::default(),
        }
    }
}

impl EntityCore {
    /// Moves the entity by `desired`, stopping at obstacles.
    ///
    /// # Errors
    ///
    /// Returns [`MovementError::InsideBlock`] if a block side effect fails.
    /// The entity has already moved when this happens; the caller must treat
    /// the error as fatal for the tick.
    pub fn move_entity(
        &mut self,
        mover: MoverType,
        desired: DVec3,
        ctx: &mut MoveContext<'_>,
    ) -> Result<(), MovementError> {
        if self.no_physics {
            self.set_pos(self.position() + desired);
            return Ok(());
        }
        let world = ctx.world;
        let was_on_fire = self.is_on_fire();
        let mut desired = desired;

        if mover.is_machinery() {
            desired = self.limit_piston_movement(desired, ctx.game_time);
            if desired == DVec3::ZERO {
                return Ok(());
            }
        }

        if self.stuck_speed_multiplier.length_squared() > MOVEMENT_EPSILON {
            desired *= self.stuck_speed_multiplier;
            self.stuck_speed_multiplier = DVec3::ZERO;
            self.set_delta_movement(DVec3::ZERO);
        }

        desired = self.traits.edge_avoidance.back_off(self, desired, mover, world);

        let resolved = self.collide(desired, world);
        let resolved_sq = resolved.length_squared();
        if resolved_sq > MOVEMENT_EPSILON {
            if self.fall_distance != 0.0 && resolved_sq >= 1.0 {
                let from = self.position();
                if path_resets_fall(world, from, from + resolved) {
                    self.reset_fall_distance();
                }
            }
            self.set_pos(self.position() + resolved);
        }

        let x_blocked = desired.x != resolved.x;
        let z_blocked = desired.z != resolved.z;
        self.flags.horizontal_collision = x_blocked || z_blocked;
        self.flags.vertical_collision = desired.y != resolved.y;
        self.flags.vertical_collision_below = self.flags.vertical_collision && desired.y < 0.0;
        self.flags.minor_horizontal_collision =
            self.flags.horizontal_collision && self.is_horizontal_collision_minor(resolved);

        let below = self.flags.vertical_collision_below;
        self.set_on_ground_with_known_movement(below, Some(resolved), world);
        trace!(
            entity = self.id(),
            ?mover,
            ?desired,
            ?resolved,
            flags = ?self.flags,
            "Resolved move"
        );

        let legacy_pos = self.on_pos_legacy(world);
        let legacy_block = world.block_at(legacy_pos);
        self.check_fall_damage(resolved.y, self.on_ground(), legacy_pos, ctx.sink);

        if self.flags.horizontal_collision {
            let v = self.delta_movement();
            self.set_delta_movement(DVec3::new(
                if x_blocked { 0.0 } else { v.x },
                v.y,
                if z_blocked { 0.0 } else { v.z },
            ));
        }

        if desired.y != resolved.y {
            let v = self.delta_movement();
            self.set_delta_movement(DVec3::new(v.x, 0.0, v.z));
            ctx.sink.landed_on_block(self.id(), legacy_pos);
        }
        if self.on_ground() {
            ctx.sink.stepped_on_block(self.id(), legacy_pos);
        }

        self.emit_movement(desired, resolved, legacy_pos, legacy_block, ctx);
        self.check_inside_blocks(ctx)?;

        let speed = self.block_speed_factor(world) as f64;
        let v = self.delta_movement();
        self.set_delta_movement(DVec3::new(v.x * speed, v.y, v.z * speed));

        let fire_scan = self.bounding_box().deflate(FIRE_SCAN_MARGIN);
        let burning_nearby = any_block_in(world, &fire_scan, |def| def.ignites);
        if !burning_nearby {
            if self.remaining_fire_ticks <= 0 {
                self.remaining_fire_ticks = -self.traits.fire_immune_ticks;
            }
            if was_on_fire && self.is_in_water() {
                let pitch = 1.6 + jitter(ctx.rng);
                ctx.sink.play_sound(self.position(), SoundKind::FireExtinguish, 0.7, pitch);
            }
        }
        if self.is_on_fire() && self.is_in_water() {
            self.remaining_fire_ticks = -self.traits.fire_immune_ticks;
        }
        Ok(())
    }

    /// Lands the entity or accumulates its fall.
    ///
    /// On landing with a pending fall the block at `pos` receives the impact
    /// and a `HitGround` event fires; the fall distance always resets while
    /// grounded. Airborne downward motion adds to the fall distance.
    pub fn check_fall_damage(
        &mut self,
        dy: f64,
        on_ground: bool,
        pos: IVec3,
        sink: &mut dyn MovementSink,
    ) {
        if on_ground {
            if self.fall_distance > 0.0 {
                sink.fall_on(self.id(), pos, self.fall_distance);
                sink.game_event(self.position(), GameEventKind::HitGround, self.id());
            }
            self.reset_fall_distance();
        } else if dy < 0.0 {
            self.fall_distance -= dy as f32;
        }
    }

    /// Step sounds and events, paced by distance walked.
    fn emit_movement(
        &mut self,
        desired: DVec3,
        resolved: DVec3,
        legacy_pos: IVec3,
        legacy_block: &BlockDef,
        ctx: &mut MoveContext<'_>,
    ) {
        let emission = self.traits.emission;
        if !emission.emits_anything() {
            return;
        }
        self.fly_dist += (resolved.length() * STEP_DISTANCE_SCALE as f64) as f32;

        let world = ctx.world;
        let on_pos = self.on_pos(world);
        let on_block = world.block_at(on_pos);
        let dy = if on_block.climbable { resolved.y } else { 0.0 };
        self.walk_dist += horizontal_distance_sqr(resolved).sqrt() as f32 * STEP_DISTANCE_SCALE;
        let travelled = (resolved.x * resolved.x + dy * dy + resolved.z * resolved.z).sqrt();
        self.move_dist += travelled as f32 * STEP_DISTANCE_SCALE;

        if self.move_dist <= self.next_step || on_block.is_air() {
            return;
        }
        let same = on_pos == legacy_pos;
        let mut stepped = self.step_effects(
            legacy_pos,
            legacy_block,
            emission.emits_sounds(),
            same && emission.emits_events(),
            desired,
            ctx.sink,
        );
        if !same {
            stepped |= self.step_effects(
                on_pos,
                on_block,
                false,
                emission.emits_events(),
                desired,
                ctx.sink,
            );
        }

        if stepped {
            self.next_step = self.move_dist.trunc() + 1.0;
        } else if self.is_in_water() {
            self.next_step = self.move_dist.trunc() + 1.0;
            if emission.emits_sounds() {
                self.swim_sound(ctx);
            }
            if emission.emits_events() {
                ctx.sink.game_event(self.position(), GameEventKind::Swim, self.id());
            }
        }
    }

    fn step_effects(
        &self,
        pos: IVec3,
        block: &BlockDef,
        play_sound: bool,
        broadcast: bool,
        desired: DVec3,
        sink: &mut dyn MovementSink,
    ) -> bool {
        if block.is_air() {
            return false;
        }
        let crouching_in_place = self.sneaking && desired.y == 0.0;
        if !(self.on_ground() || block.climbable || crouching_in_place) {
            return false;
        }
        if play_sound {
            sink.play_sound(
                pos.as_dvec3(),
                SoundKind::Step {
                    block: block.name.clone(),
                },
                0.15,
                1.0,
            );
        }
        if broadcast {
            sink.game_event(self.position(), GameEventKind::Step, self.id());
        }
        true
    }

    fn swim_sound(&self, ctx: &mut MoveContext<'_>) {
        let v = self.delta_movement();
        let speed = (v.x * v.x * 0.2 + v.y * v.y + v.z * v.z * 0.2).sqrt() as f32;
        let volume = (speed * 0.35).min(1.0);
        let pitch = 1.0 + jitter(ctx.rng);
        ctx.sink.play_sound(self.position(), SoundKind::Swim, volume, pitch);
    }

    /// Runs the inside-block handler for every cell the box overlaps.
    fn check_inside_blocks(&mut self, ctx: &mut MoveContext<'_>) -> Result<(), MovementError> {
        let world = ctx.world;
        let aabb = *self.bounding_box();
        let min = block_containing(aabb.min + DVec3::splat(INSIDE_BLOCK_MARGIN));
        let max = block_containing(aabb.max - DVec3::splat(INSIDE_BLOCK_MARGIN));
        if !world.has_chunks_at(min, max) {
            return Ok(());
        }
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    let pos = IVec3::new(x, y, z);
                    let block = world.block_at(pos);
                    if let Err(source) = ctx.inside.entity_inside(pos, block, self) {
                        let err = MovementError::InsideBlock {
                            entity: self.id(),
                            block: block.name.clone(),
                            block_pos: pos,
                            position: self.position(),
                            bounding_box: *self.bounding_box(),
                            source,
                        };
                        error!(%err, "Block side effect failed");
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }

    /// Applies gravity and drag to the velocity after a move.
    ///
    /// Water slows the entity evenly and weakens gravity; on land, ground
    /// friction or air drag applies horizontally.
    pub fn apply_gravity(&mut self, gravity: f64) {
        let v = self.delta_movement();
        let next = if self.is_in_water() {
            DVec3::new(v.x * WATER_DRAG, v.y * WATER_DRAG - gravity / 4.0, v.z * WATER_DRAG)
        } else {
            let friction = if self.on_ground() { GROUND_FRICTION } else { AIR_FRICTION };
            DVec3::new(v.x * friction, (v.y - gravity) * AIR_DRAG, v.z * friction)
        };
        self.set_delta_movement(next);
    }

    /// Moves by the current velocity, then applies gravity and drag.
    ///
    /// # Errors
    ///
    /// Propagates [`MovementError`] from [`move_entity`](Self::move_entity).
    pub fn travel(&mut self, ctx: &mut MoveContext<'_>, gravity: f64) -> Result<(), MovementError> {
        let velocity = self.delta_movement();
        self.move_entity(MoverType::SelfPropelled, velocity, ctx)?;
        self.apply_gravity(gravity);
        debug!(
            entity = self.id(),
            x = self.position().x,
            y = self.position().y,
            z = self.position().z,
            on_ground = self.on_ground(),
            "Travelled"
        );
        Ok(())
    }

    /// One full tick for an entity outside the ECS: fluid pass, then
    /// [`travel`](Self::travel).
    ///
    /// # Errors
    ///
    /// Propagates [`MovementError`] from [`move_entity`](Self::move_entity).
    pub fn tick_physics(
        &mut self,
        ctx: &mut MoveContext<'_>,
        params: &TravelParams,
    ) -> Result<(), MovementError> {
        self.update_in_fluids(ctx.world, &params.flow_scales, &mut *ctx.sink);
        self.travel(ctx, params.gravity)
    }
}

/// Pitch variation in `(-0.4, 0.4)`.
fn jitter(rng: &mut dyn RngCore) -> f32 {
    (rng.random::<f32>() - rng.random::<f32>()) * 0.4
}

/// Returns true if any loaded cell overlapping `aabb` matches `predicate`.
/// Unloaded regions match nothing.
fn any_block_in(
    world: &dyn CollisionWorld,
    aabb: &Aabb,
    predicate: impl Fn(&BlockDef) -> bool,
) -> bool {
    let min = IVec3::new(floor_i32(aabb.min.x), floor_i32(aabb.min.y), floor_i32(aabb.min.z));
    let max = IVec3::new(ceil_i32(aabb.max.x), ceil_i32(aabb.max.y), ceil_i32(aabb.max.z));
    if !world.has_chunks_at(min, max) {
        return false;
    }
    for x in min.x..max.x {
        for y in min.y..max.y {
            for z in min.z..max.z {
                if predicate(world.block_at(IVec3::new(x, y, z))) {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
#[path = "movement_tests.rs"]
mod tests;
