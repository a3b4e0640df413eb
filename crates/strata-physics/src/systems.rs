//! ECS integration for the movement resolver.
//!
//! Simulated entities carry a [`Mobile`] component. Each tick the schedule
//! built by [`add_movement_systems`] runs, in order:
//!
//! 1. [`fluid_system`]: submersion depth and current push for every entity.
//! 2. [`travel_system`]: velocity, gravity and drag for [`Travelling`] entities.
//! 3. [`movement_system`]: one-shot displacements queued as [`MoveRequest`]s.
//! 4. [`end_tick_system`]: advances [`GameTime`] and rotates the event buffer.
//!
//! Entities are processed sequentially in query order. A [`MovementError`] is
//! logged and then panics: a failed block effect leaves the world in a state
//! the tick cannot recover from.

use bevy_ecs::prelude::*;
use glam::DVec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata_voxel::BlockWorld;
use tracing::error;

use crate::effects::{InsideBlockHandler, StandardBlockEffects};
use crate::entity::EntityCore;
use crate::error::MovementError;
use crate::events::MovementEventBuffer;
use crate::movement::{MoveContext, MoverType, TravelParams};

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// The movement ledger of a simulated entity.
#[derive(Component, Debug)]
pub struct Mobile(pub EntityCore);

/// Marker for entities moved by their own velocity every tick.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Travelling;

/// A displacement to apply once during the next movement pass. Removed after
/// it has been applied.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct MoveRequest {
    pub mover: MoverType,
    pub displacement: DVec3,
}

impl MoveRequest {
    pub fn new(mover: MoverType, displacement: DVec3) -> Self {
        Self { mover, displacement }
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Monotonic world tick counter.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GameTime(pub u64);

/// The block world every entity collides with.
#[derive(Resource)]
pub struct SimWorld(pub BlockWorld);

/// Seeded source of sound pitch jitter.
#[derive(Resource)]
pub struct SimRng(pub ChaCha8Rng);

impl SimRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

/// Side effects reported by the resolver, readable for two ticks.
#[derive(Resource, Debug, Default)]
pub struct MovementEvents(pub MovementEventBuffer);

/// Handler run for every block an entity overlaps after moving.
#[derive(Resource)]
pub struct BlockEffects(pub Box<dyn InsideBlockHandler + Send + Sync>);

impl Default for BlockEffects {
    fn default() -> Self {
        Self(Box::new(StandardBlockEffects))
    }
}

/// Gravity and fluid constants for [`travel_system`] and [`fluid_system`].
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq)]
pub struct Travel(pub TravelParams);

/// Inserts every resource the movement systems read.
pub fn insert_movement_resources(
    world: &mut World,
    blocks: BlockWorld,
    seed: u64,
    params: TravelParams,
) {
    world.insert_resource(SimWorld(blocks));
    world.insert_resource(SimRng::from_seed(seed));
    world.insert_resource(GameTime::default());
    world.insert_resource(MovementEvents::default());
    world.insert_resource(BlockEffects::default());
    world.insert_resource(Travel(params));
}

/// Adds the movement systems to `schedule` in tick order.
pub fn add_movement_systems(schedule: &mut Schedule) {
    schedule.add_systems((fluid_system, travel_system, movement_system, end_tick_system).chain());
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Recomputes fluid depth and applies currents for every entity.
pub fn fluid_system(
    world: Res<SimWorld>,
    travel: Res<Travel>,
    mut events: ResMut<MovementEvents>,
    mut query: Query<&mut Mobile>,
) {
    for mut mobile in &mut query {
        mobile.0.update_in_fluids(&world.0, &travel.0.flow_scales, &mut events.0);
    }
}

/// Moves [`Travelling`] entities by their velocity and applies gravity.
pub fn travel_system(
    world: Res<SimWorld>,
    time: Res<GameTime>,
    travel: Res<Travel>,
    mut rng: ResMut<SimRng>,
    mut events: ResMut<MovementEvents>,
    mut effects: ResMut<BlockEffects>,
    mut query: Query<&mut Mobile, With<Travelling>>,
) {
    for mut mobile in &mut query {
        let mut ctx = MoveContext {
            world: &world.0,
            sink: &mut events.0,
            inside: effects.0.as_mut(),
            rng: &mut rng.0,
            game_time: time.0,
        };
        if let Err(err) = mobile.0.travel(&mut ctx, travel.0.gravity) {
            abort_tick(err);
        }
    }
}

/// Applies and consumes pending [`MoveRequest`]s.
pub fn movement_system(
    mut commands: Commands,
    world: Res<SimWorld>,
    time: Res<GameTime>,
    mut rng: ResMut<SimRng>,
    mut events: ResMut<MovementEvents>,
    mut effects: ResMut<BlockEffects>,
    mut query: Query<(Entity, &mut Mobile, &MoveRequest)>,
) {
    for (entity, mut mobile, request) in &mut query {
        let mut ctx = MoveContext {
            world: &world.0,
            sink: &mut events.0,
            inside: effects.0.as_mut(),
            rng: &mut rng.0,
            game_time: time.0,
        };
        if let Err(err) = mobile.0.move_entity(request.mover, request.displacement, &mut ctx) {
            abort_tick(err);
        }
        commands.entity(entity).remove::<MoveRequest>();
    }
}

/// Advances the game clock and rotates the event buffer.
pub fn end_tick_system(mut time: ResMut<GameTime>, mut events: ResMut<MovementEvents>) {
    time.0 += 1;
    events.0.swap();
}

fn abort_tick(err: MovementError) -> ! {
    error!(%err, "Aborting tick after failed movement");
    panic!("{err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Dimensions, MovementTraits};
    use crate::error::BlockEffectError;
    use crate::events::MovementEvent;
    use glam::IVec3;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use strata_voxel::{BlockDef, BlockTypeRegistry};

    fn setup() -> (World, Schedule) {
        let mut registry = BlockTypeRegistry::new();
        let stone = registry.register(BlockDef::solid("stone")).unwrap();
        registry
            .register(BlockDef {
                stuck_speed: Some([f64::NAN, 0.0, 0.0]),
                ..BlockDef::passable("broken_web")
            })
            .unwrap();
        let mut blocks = BlockWorld::new(registry);
        blocks.load_area(IVec3::new(-16, 0, -16), IVec3::new(15, 0, 15));
        blocks.fill(IVec3::new(-8, 0, -8), IVec3::new(8, 0, 8), stone);

        let mut world = World::new();
        insert_movement_resources(&mut world, blocks, 9, TravelParams::default());
        let mut schedule = Schedule::default();
        add_movement_systems(&mut schedule);
        (world, schedule)
    }

    fn mobile_at(id: u64, position: DVec3) -> Mobile {
        let dimensions = Dimensions::scalable(0.6, 1.8);
        Mobile(EntityCore::new(id, position, dimensions, MovementTraits::walker(0.6)))
    }

    #[test]
    fn test_move_request_is_applied_once() {
        let (mut world, mut schedule) = setup();
        let entity = world
            .spawn((
                mobile_at(1, DVec3::new(0.5, 1.0, 0.5)),
                MoveRequest::new(MoverType::SelfPropelled, DVec3::new(0.5, -0.08, 0.0)),
            ))
            .id();

        schedule.run(&mut world);
        assert!(world.get::<MoveRequest>(entity).is_none());
        let mobile = world.get::<Mobile>(entity).unwrap();
        assert_eq!(mobile.0.position(), DVec3::new(1.0, 1.0, 0.5));
        assert!(mobile.0.on_ground());

        schedule.run(&mut world);
        let mobile = world.get::<Mobile>(entity).unwrap();
        assert_eq!(mobile.0.position(), DVec3::new(1.0, 1.0, 0.5));
    }

    #[test]
    fn test_travelling_entity_falls_and_lands() {
        let (mut world, mut schedule) = setup();
        let entity = world.spawn((mobile_at(1, DVec3::new(0.5, 3.0, 0.5)), Travelling)).id();
        let still = world.spawn(mobile_at(2, DVec3::new(3.5, 3.0, 3.5))).id();

        for _ in 0..30 {
            schedule.run(&mut world);
        }
        let mobile = world.get::<Mobile>(entity).unwrap();
        assert!(mobile.0.on_ground());
        assert!((mobile.0.position().y - 1.0).abs() < 1e-9);
        // Without the marker nothing moves it.
        assert_eq!(world.get::<Mobile>(still).unwrap().0.position().y, 3.0);
    }

    #[test]
    fn test_end_of_tick_advances_clock_and_events() {
        let (mut world, mut schedule) = setup();
        world.spawn((
            mobile_at(1, DVec3::new(0.5, 1.0, 0.5)),
            MoveRequest::new(MoverType::SelfPropelled, DVec3::new(0.0, -0.08, 0.0)),
        ));

        schedule.run(&mut world);
        assert_eq!(world.resource::<GameTime>().0, 1);
        let events = &world.resource::<MovementEvents>().0;
        assert!(events.current().is_empty());
        assert!(events.read().any(|ev| matches!(ev, MovementEvent::SteppedOn { entity: 1, .. })));

        schedule.run(&mut world);
        schedule.run(&mut world);
        assert_eq!(world.resource::<GameTime>().0, 3);
        assert!(world.resource::<MovementEvents>().0.is_empty());
    }

    #[test]
    fn test_piston_budget_follows_game_time() {
        let (mut world, mut schedule) = setup();
        let entity = world.spawn(mobile_at(1, DVec3::new(0.5, 5.0, 0.5))).id();

        world
            .entity_mut(entity)
            .insert(MoveRequest::new(MoverType::Piston, DVec3::new(0.4, 0.0, 0.0)));
        schedule.run(&mut world);
        world
            .entity_mut(entity)
            .insert(MoveRequest::new(MoverType::Piston, DVec3::new(0.4, 0.0, 0.0)));
        schedule.run(&mut world);

        // Different ticks: both pushes are applied in full.
        let x = world.get::<Mobile>(entity).unwrap().0.position().x;
        assert!((x - 1.3).abs() < 1e-9, "x={x}");
    }

    #[test]
    #[should_panic(expected = "broken_web")]
    fn test_failed_block_effect_panics() {
        let (mut world, mut schedule) = setup();
        let registry = world.resource::<SimWorld>().0.registry();
        let broken = registry.lookup_by_name("broken_web").unwrap();
        world.resource_mut::<SimWorld>().0.set_block(IVec3::new(0, 1, 0), broken);
        world.spawn((
            mobile_at(1, DVec3::new(0.5, 1.0, 0.5)),
            MoveRequest::new(MoverType::SelfPropelled, DVec3::new(0.0, -0.08, 0.0)),
        ));
        schedule.run(&mut world);
    }

    /// Counts handler calls into a shared counter.
    struct CountingEffects(Arc<AtomicUsize>);

    impl InsideBlockHandler for CountingEffects {
        fn entity_inside(
            &mut self,
            _: IVec3,
            _: &BlockDef,
            _: &mut EntityCore,
        ) -> Result<(), BlockEffectError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    #[test]
    fn test_block_effects_resource_is_pluggable() {
        let (mut world, mut schedule) = setup();
        let registry = world.resource::<SimWorld>().0.registry();
        let broken = registry.lookup_by_name("broken_web").unwrap();
        world.resource_mut::<SimWorld>().0.set_block(IVec3::new(0, 1, 0), broken);
        let calls = Arc::new(AtomicUsize::new(0));
        world.insert_resource(BlockEffects(Box::new(CountingEffects(Arc::clone(&calls)))));
        world.spawn((
            mobile_at(1, DVec3::new(0.5, 1.0, 0.5)),
            MoveRequest::new(MoverType::SelfPropelled, DVec3::new(0.0, -0.08, 0.0)),
        ));

        // The replacement handler ignores the broken definition.
        schedule.run(&mut world);
        // One call per overlapped cell: feet and head.
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }
}
