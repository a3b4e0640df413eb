//! Submersion depth and current push.
//!
//! Each tick the cells overlapped by the entity's box are scanned per fluid
//! kind. The deepest surface sets the submersion depth; the average flow of
//! the touched cells pushes the entity along.

use glam::{DVec3, IVec3};
use strata_math::{block_containing, ceil_i32, floor_i32, normalize_or_zero};
use strata_voxel::{CollisionWorld, FluidKind};
use tracing::trace;

use crate::entity::EntityCore;
use crate::events::{GameEventKind, MovementSink, SoundKind};

/// Below this depth the push from a cell is scaled by the depth.
const SHALLOW_DEPTH: f64 = 0.4;
/// Velocities below this on both horizontal axes count as standing still.
const STILL_VELOCITY: f64 = 0.003;
/// Smallest push applied to a still entity.
const MIN_PUSH: f64 = 0.004_500_000_000_000_000_5;

/// Strength of fluid currents, per fluid and dimension.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluidFlowScales {
    pub water: f64,
    pub lava: f64,
    /// Lava in ultra-warm dimensions.
    pub lava_ultra_warm: f64,
}

impl Default for FluidFlowScales {
    fn default() -> Self {
        Self {
            water: 0.014,
            lava: 0.0023333333333333335,
            lava_ultra_warm: 0.007,
        }
    }
}

impl EntityCore {
    /// Records how deep the entity is in `kind` and pushes it with the
    /// current. Returns true if any cell of that fluid touches the box.
    pub fn update_fluid_height_and_do_fluid_pushing(
        &mut self,
        kind: FluidKind,
        flow_scale: f64,
        world: &dyn CollisionWorld,
    ) -> bool {
        let outer = self.bounding_box().inflate(1.0);
        let loaded = world.has_chunks_at(
            block_containing(outer.min),
            IVec3::new(ceil_i32(outer.max.x), ceil_i32(outer.max.y), ceil_i32(outer.max.z)),
        );
        if !loaded {
            trace!(entity = self.id(), ?kind, "Skipping fluid scan in unloaded area");
            return false;
        }

        let aabb = self.bounding_box().deflate(0.001);
        let (min_x, max_x) = (floor_i32(aabb.min.x), ceil_i32(aabb.max.x));
        let (min_y, max_y) = (floor_i32(aabb.min.y), ceil_i32(aabb.max.y));
        let (min_z, max_z) = (floor_i32(aabb.min.z), ceil_i32(aabb.max.z));
        let pushed = self.traits.pushed_by_fluid;

        let mut depth = 0.0_f64;
        let mut submerged = false;
        let mut push = DVec3::ZERO;
        let mut cells = 0_u32;

        for x in min_x..max_x {
            for y in min_y..max_y {
                for z in min_z..max_z {
                    let pos = IVec3::new(x, y, z);
                    if !world.fluid_at(pos).is(kind) {
                        continue;
                    }
                    let surface = y as f64 + world.fluid_height(pos) as f64;
                    if surface < aabb.min.y {
                        continue;
                    }
                    submerged = true;
                    depth = depth.max(surface - aabb.min.y);
                    if pushed {
                        let mut flow = world.fluid_flow(pos);
                        if depth < SHALLOW_DEPTH {
                            flow *= depth;
                        }
                        push += flow;
                        cells += 1;
                    }
                }
            }
        }

        if push.length() > 0.0 {
            if cells > 0 {
                push /= cells as f64;
            }
            if !self.traits.proportional_fluid_push {
                push = normalize_or_zero(push);
            }
            push *= flow_scale;
            let velocity = self.delta_movement();
            if velocity.x.abs() < STILL_VELOCITY
                && velocity.z.abs() < STILL_VELOCITY
                && push.length() < MIN_PUSH
            {
                push = normalize_or_zero(push) * MIN_PUSH;
            }
            self.set_delta_movement(velocity + push);
        }

        self.fluid_heights.insert(kind, depth);
        submerged
    }

    /// Per-tick fluid pass: recomputes water and lava depth, applies both
    /// currents, and updates the in-water state. Water cancels falls and puts
    /// out fire. Returns true if the entity touches any fluid.
    pub fn update_in_fluids(
        &mut self,
        world: &dyn CollisionWorld,
        scales: &FluidFlowScales,
        sink: &mut dyn MovementSink,
    ) -> bool {
        self.fluid_heights.clear();

        if self.update_fluid_height_and_do_fluid_pushing(FluidKind::Water, scales.water, world) {
            if !self.was_touching_water && !self.first_tick {
                let at = self.position();
                sink.play_sound(at, SoundKind::Splash, 0.1, 1.0);
                sink.game_event(at, GameEventKind::Splash, self.id());
            }
            self.reset_fall_distance();
            self.was_touching_water = true;
            self.clear_fire();
        } else {
            self.was_touching_water = false;
        }

        let lava_scale = if world.is_ultra_warm() {
            scales.lava_ultra_warm
        } else {
            scales.lava
        };
        let in_lava =
            self.update_fluid_height_and_do_fluid_pushing(FluidKind::Lava, lava_scale, world);
        self.first_tick = false;
        self.was_touching_water || in_lava
    }
}
