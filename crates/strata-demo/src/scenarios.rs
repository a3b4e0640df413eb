//! Scripted scenarios: a wall, a slab, a water channel and a piston.

use std::error::Error;

use bevy_ecs::prelude::*;
use glam::{DVec3, IVec3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata_config::Config;
use strata_physics::{
    Dimensions, EntityCore, FluidFlowScales, GameTime, Mobile, MoveContext, MoveRequest,
    MovementError, MovementEventBuffer, MovementEvents, MovementTraits, MoverType, SimWorld,
    StandardBlockEffects, TravelParams, Travelling, add_movement_systems,
    insert_movement_resources,
};
use strata_voxel::{
    BlockDef, BlockTypeRegistry, BlockWorld, CollisionKind, FluidKind, FluidState,
    RegistryError, WorldBorder, water_block,
};
use tracing::{debug, info};

const WALKER_START: DVec3 = DVec3::new(2.5, 1.0, 0.5);
const CLIMBER_START: DVec3 = DVec3::new(1.5, 1.0, 7.5);
const SWIMMER_START: DVec3 = DVec3::new(-4.5, 1.0, -7.5);
const PUSHED_START: DVec3 = DVec3::new(0.5, 5.0, -14.5);

/// What each scenario ended with.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub wall_x: f64,
    pub wall_blocked: bool,
    pub slab_y: f64,
    pub slab_blocked: bool,
    /// Eastward velocity after the first tick in the channel.
    pub current_velocity_x: f64,
    pub current_final_x: f64,
    /// Applied piston displacements: two pushes in one tick, then one more
    /// on the following tick.
    pub piston_pushes: [f64; 3],
    pub events_seen: usize,
}

impl ScenarioReport {
    pub fn summary(&self) -> Vec<String> {
        vec![
            format!(
                "Wall: stopped at x={:.3} (horizontal collision: {})",
                self.wall_x, self.wall_blocked
            ),
            format!(
                "Slab: standing at y={:.3} (horizontal collision: {})",
                self.slab_y, self.slab_blocked
            ),
            format!(
                "Current: vx={:.5} after one tick, drifted to x={:.3}",
                self.current_velocity_x, self.current_final_x
            ),
            format!(
                "Piston: pushed {:.3} then {:.3} in one tick, {:.3} on the next",
                self.piston_pushes[0], self.piston_pushes[1], self.piston_pushes[2]
            ),
        ]
    }
}

/// Builds the scenario world.
///
/// Layout, all on a stone floor at y=0:
/// - a three block high wall at x=4 in front of the walker,
/// - a half slab at x=2 in front of the climber,
/// - a walled water channel along z=-8 whose level drops toward +x.
pub fn build_world(config: &Config) -> Result<BlockWorld, RegistryError> {
    let mut registry = BlockTypeRegistry::new();
    let stone = registry.register(BlockDef::solid("stone"))?;
    let slab = registry.register(BlockDef {
        collision: CollisionKind::slab(0.5),
        ..BlockDef::solid("slab")
    })?;
    registry.register(water_block())?;

    let mut world = BlockWorld::new(registry);
    world.load_area(IVec3::new(-32, 0, -32), IVec3::new(31, 0, 31));
    world.fill(IVec3::new(-24, 0, -24), IVec3::new(24, 0, 24), stone);

    world.fill(IVec3::new(4, 1, -2), IVec3::new(4, 3, 2), stone);
    world.fill(IVec3::new(2, 1, 6), IVec3::new(2, 1, 9), slab);

    world.fill(IVec3::new(-7, 1, -9), IVec3::new(-1, 1, -9), stone);
    world.fill(IVec3::new(-7, 1, -7), IVec3::new(-1, 1, -7), stone);
    for (x, amount) in (-6..=-2).zip((4..=8).rev()) {
        world.set_fluid(IVec3::new(x, 1, -8), FluidState::flowing(FluidKind::Water, amount, false));
    }

    world.set_border(WorldBorder::new(0.0, 0.0, config.simulation.world_border_size));
    world.set_ultra_warm(config.simulation.ultra_warm);
    debug!(chunks = world.loaded_count(), "Built scenario world");
    Ok(world)
}

/// Travel constants taken from the physics config.
pub fn travel_params(config: &Config) -> TravelParams {
    TravelParams {
        gravity: config.physics.gravity,
        flow_scales: FluidFlowScales {
            water: config.physics.water_flow_scale,
            lava: config.physics.lava_flow_scale,
            lava_ultra_warm: config.physics.lava_flow_scale_ultra_warm,
        },
    }
}

fn spawn_core(config: &Config, id: u64, position: DVec3) -> EntityCore {
    EntityCore::new(
        id,
        position,
        Dimensions::scalable(config.physics.entity_width, config.physics.entity_height),
        MovementTraits::walker(config.physics.default_step_height),
    )
}

/// Runs every scenario for `config.simulation.ticks` ticks (at least two).
///
/// # Errors
///
/// Fails if the block registry rejects a definition or a block effect fails
/// during the piston burst. Failures inside the schedule panic.
pub fn run(config: &Config) -> Result<ScenarioReport, Box<dyn Error>> {
    let ticks = config.simulation.ticks.max(2);
    let blocks = build_world(config)?;
    let mut world = World::new();
    insert_movement_resources(&mut world, blocks, config.simulation.seed, travel_params(config));
    let mut schedule = Schedule::default();
    add_movement_systems(&mut schedule);

    let walker = world
        .spawn((
            Mobile(spawn_core(config, 1, WALKER_START)),
            MoveRequest::new(MoverType::SelfPropelled, DVec3::new(3.0, -0.08, 0.0)),
        ))
        .id();
    let climber = world
        .spawn((
            Mobile(spawn_core(config, 2, CLIMBER_START)),
            MoveRequest::new(MoverType::SelfPropelled, DVec3::new(1.0, -0.08, 0.0)),
        ))
        .id();
    let swimmer = world
        .spawn((Mobile(spawn_core(config, 3, SWIMMER_START)), Travelling))
        .id();

    let (pushed, first_pushes, burst_events) = piston_burst(&world, config)?;
    let pushed = world.spawn(Mobile(pushed)).id();

    let mut events_seen = burst_events;
    let mut current_velocity_x = 0.0;
    let mut before_push = PUSHED_START.x;
    for tick in 0..ticks {
        if tick == 1 {
            before_push = position(&world, pushed).x;
            world
                .entity_mut(pushed)
                .insert(MoveRequest::new(MoverType::Piston, DVec3::new(0.4, 0.0, 0.0)));
        }
        schedule.run(&mut world);
        events_seen += world.resource::<MovementEvents>().0.read().count();
        if tick == 0 {
            current_velocity_x = mobile(&world, swimmer).map_or(0.0, |m| m.0.delta_movement().x);
        }
    }

    let flags = |entity| mobile(&world, entity).map(|m| m.0.flags()).unwrap_or_default();
    let report = ScenarioReport {
        wall_x: position(&world, walker).x,
        wall_blocked: flags(walker).horizontal_collision,
        slab_y: position(&world, climber).y,
        slab_blocked: flags(climber).horizontal_collision,
        current_velocity_x,
        current_final_x: position(&world, swimmer).x,
        piston_pushes: [
            first_pushes[0],
            first_pushes[1],
            position(&world, pushed).x - before_push,
        ],
        events_seen,
    };
    info!(game_time = world.resource::<GameTime>().0, "Ran {ticks} ticks");
    Ok(report)
}

/// Two piston pushes against one entity within a single tick. Returns the
/// entity, the displacement each push applied, and the number of events.
fn piston_burst(
    world: &World,
    config: &Config,
) -> Result<(EntityCore, [f64; 2], usize), MovementError> {
    let blocks = &world.resource::<SimWorld>().0;
    let game_time = world.resource::<GameTime>().0;
    let mut sink = MovementEventBuffer::new();
    let mut effects = StandardBlockEffects;
    let mut rng = ChaCha8Rng::seed_from_u64(config.simulation.seed);
    let mut entity = spawn_core(config, 4, PUSHED_START);

    let mut applied = [0.0; 2];
    for (slot, push) in applied.iter_mut().zip([0.3, 0.4]) {
        let before = entity.position().x;
        let mut ctx = MoveContext {
            world: blocks,
            sink: &mut sink,
            inside: &mut effects,
            rng: &mut rng,
            game_time,
        };
        entity.move_entity(MoverType::Piston, DVec3::new(push, 0.0, 0.0), &mut ctx)?;
        *slot = entity.position().x - before;
    }
    debug!(?applied, "Piston burst");
    Ok((entity, applied, sink.len()))
}

fn mobile(world: &World, entity: Entity) -> Option<&Mobile> {
    world.get::<Mobile>(entity)
}

fn position(world: &World, entity: Entity) -> DVec3 {
    mobile(world, entity).map_or(DVec3::ZERO, |m| m.0.position())
}
