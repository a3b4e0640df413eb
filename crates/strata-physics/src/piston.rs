//! Per-tick budget for displacement imposed by pistons and shulker boxes.

use glam::DVec3;
use strata_math::Axis;
use tracing::trace;

/// Furthest machinery may push an entity along one axis in a single tick.
pub const MAX_PISTON_PUSH: f64 = 0.51;

/// Smallest push still applied after clamping.
const MIN_PISTON_PUSH: f64 = 1.0e-5_f32 as f64;

/// Cumulative machinery displacement per axis for the current game tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PistonDeltas {
    deltas: [f64; 3],
    game_time: u64,
}

impl PistonDeltas {
    /// Clamps a machinery push so the per-axis total for `game_time` stays
    /// within ±[`MAX_PISTON_PUSH`].
    ///
    /// Only the first non-zero axis (X, then Y, then Z) is kept. Returns zero
    /// when the remaining budget is spent.
    pub fn limit(&mut self, displacement: DVec3, game_time: u64) -> DVec3 {
        if displacement.length_squared() <= 1.0e-7 {
            return displacement;
        }
        if game_time != self.game_time {
            self.deltas = [0.0; 3];
            self.game_time = game_time;
        }

        let Some(axis) = Axis::ALL.into_iter().find(|a| a.of(displacement) != 0.0) else {
            return DVec3::ZERO;
        };
        let slot = axis.ordinal();
        let accumulated = self.deltas[slot];
        let clamped =
            (axis.of(displacement) + accumulated).clamp(-MAX_PISTON_PUSH, MAX_PISTON_PUSH);
        let allowed = clamped - accumulated;
        self.deltas[slot] = clamped;

        if allowed.abs() <= MIN_PISTON_PUSH {
            trace!(?axis, accumulated, "Piston budget exhausted");
            return DVec3::ZERO;
        }
        axis.vector(allowed)
    }

    /// Accumulated push on `axis` for the current tick.
    pub fn accumulated(&self, axis: Axis) -> f64 {
        self.deltas[axis.ordinal()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_push_in_tick_is_capped() {
        let mut deltas = PistonDeltas::default();
        let first = deltas.limit(DVec3::new(0.3, 0.0, 0.0), 5);
        let second = deltas.limit(DVec3::new(0.4, 0.0, 0.0), 5);
        assert!((first.x - 0.3).abs() < 1e-12);
        assert!((second.x - 0.21).abs() < 1e-9, "second={second:?}");
    }

    #[test]
    fn test_budget_is_idempotent_within_tick() {
        let mut deltas = PistonDeltas::default();
        deltas.limit(DVec3::new(0.0, 0.6, 0.0), 9);
        assert_eq!(deltas.limit(DVec3::new(0.0, 0.6, 0.0), 9), DVec3::ZERO);
        assert_eq!(deltas.limit(DVec3::new(0.0, 0.2, 0.0), 9), DVec3::ZERO);
        assert!((deltas.accumulated(Axis::Y) - MAX_PISTON_PUSH).abs() < 1e-12);
    }

    #[test]
    fn test_new_tick_resets_budget() {
        let mut deltas = PistonDeltas::default();
        deltas.limit(DVec3::new(0.0, 0.0, -0.51), 1);
        let next = deltas.limit(DVec3::new(0.0, 0.0, -0.51), 2);
        assert!((next.z + 0.51).abs() < 1e-12);
    }

    #[test]
    fn test_only_first_axis_is_kept() {
        let mut deltas = PistonDeltas::default();
        let out = deltas.limit(DVec3::new(0.2, 0.3, 0.1), 1);
        assert_eq!(out.y, 0.0);
        assert_eq!(out.z, 0.0);
        assert!((out.x - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_tiny_displacement_passes_through() {
        let mut deltas = PistonDeltas::default();
        let tiny = DVec3::new(1.0e-4, 0.0, 0.0);
        assert_eq!(deltas.limit(tiny, 1), tiny);
        assert_eq!(deltas.accumulated(Axis::X), 0.0);
    }
}
