//! Movement side-effect sinks.
//!
//! The resolver never plays sounds or dispatches gameplay events itself. It
//! reports them through a [`MovementSink`] in the order they happen; the
//! [`MovementEventBuffer`] records them for downstream systems and tests.
//! The buffer is double-buffered per tick: events written in the current tick
//! are readable in the current and next tick.

use glam::{DVec3, IVec3};
use strata_voxel::EntityId;

/// Sounds the resolver can request.
#[derive(Clone, Debug, PartialEq)]
pub enum SoundKind {
    /// Footstep on the named block.
    Step { block: String },
    /// Paddling through water.
    Swim,
    /// Entering water while submerged for the first time.
    Splash,
    /// A burning entity entering water.
    FireExtinguish,
}

/// World-level game events the resolver can broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameEventKind {
    Step,
    Swim,
    HitGround,
    Splash,
}

/// Receives movement side effects. Calls are fire-and-forget.
pub trait MovementSink {
    fn play_sound(&mut self, at: DVec3, sound: SoundKind, volume: f32, pitch: f32);

    fn game_event(&mut self, at: DVec3, event: GameEventKind, entity: EntityId);

    /// The entity's vertical motion was stopped by the block at `pos`.
    fn landed_on_block(&mut self, entity: EntityId, pos: IVec3);

    /// The entity is standing on the block at `pos` after moving.
    fn stepped_on_block(&mut self, entity: EntityId, pos: IVec3);

    /// The entity hit the ground after falling `fall_distance` blocks.
    fn fall_on(&mut self, entity: EntityId, pos: IVec3, fall_distance: f32);
}

/// A recorded side effect.
#[derive(Clone, Debug, PartialEq)]
pub enum MovementEvent {
    Sound {
        at: DVec3,
        sound: SoundKind,
        volume: f32,
        pitch: f32,
    },
    Game {
        at: DVec3,
        event: GameEventKind,
        entity: EntityId,
    },
    LandedOn {
        entity: EntityId,
        pos: IVec3,
    },
    SteppedOn {
        entity: EntityId,
        pos: IVec3,
    },
    FallOn {
        entity: EntityId,
        pos: IVec3,
        fall_distance: f32,
    },
}

/// Double-buffered storage for movement side effects.
///
/// Call [`swap`](MovementEventBuffer::swap) once per tick.
#[derive(Debug, Default)]
pub struct MovementEventBuffer {
    prev: Vec<MovementEvent>,
    current: Vec<MovementEvent>,
}

impl MovementEventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, event: MovementEvent) {
        self.current.push(event);
    }

    /// Returns all readable events (previous + current tick).
    pub fn read(&self) -> impl Iterator<Item = &MovementEvent> {
        self.prev.iter().chain(self.current.iter())
    }

    /// Events written during the current tick only.
    pub fn current(&self) -> &[MovementEvent] {
        &self.current
    }

    pub fn len(&self) -> usize {
        self.prev.len() + self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advances the tick: previous events are dropped, current becomes previous.
    pub fn swap(&mut self) {
        self.prev.clear();
        std::mem::swap(&mut self.prev, &mut self.current);
    }

    pub fn clear(&mut self) {
        self.prev.clear();
        self.current.clear();
    }
}

impl MovementSink for MovementEventBuffer {
    fn play_sound(&mut self, at: DVec3, sound: SoundKind, volume: f32, pitch: f32) {
        self.send(MovementEvent::Sound {
            at,
            sound,
            volume,
            pitch,
        });
    }

    fn game_event(&mut self, at: DVec3, event: GameEventKind, entity: EntityId) {
        self.send(MovementEvent::Game { at, event, entity });
    }

    fn landed_on_block(&mut self, entity: EntityId, pos: IVec3) {
        self.send(MovementEvent::LandedOn { entity, pos });
    }

    fn stepped_on_block(&mut self, entity: EntityId, pos: IVec3) {
        self.send(MovementEvent::SteppedOn { entity, pos });
    }

    fn fall_on(&mut self, entity: EntityId, pos: IVec3, fall_distance: f32) {
        self.send(MovementEvent::FallOn {
            entity,
            pos,
            fall_distance,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_survive_one_swap() {
        let mut buffer = MovementEventBuffer::new();
        buffer.landed_on_block(1, IVec3::ZERO);
        assert_eq!(buffer.len(), 1);

        buffer.swap();
        assert_eq!(buffer.len(), 1);
        assert!(buffer.current().is_empty());

        buffer.swap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sink_preserves_order() {
        let mut buffer = MovementEventBuffer::new();
        buffer.fall_on(3, IVec3::new(0, 1, 0), 4.0);
        buffer.game_event(DVec3::ZERO, GameEventKind::HitGround, 3);
        let events: Vec<_> = buffer.read().cloned().collect();
        assert!(matches!(events[0], MovementEvent::FallOn { entity: 3, .. }));
        assert!(matches!(
            events[1],
            MovementEvent::Game {
                event: GameEventKind::HitGround,
                ..
            }
        ));
    }
}
