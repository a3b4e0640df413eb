//! Block-grid raycasting using the DDA (Amanatides & Woo) algorithm.
//!
//! Walks every cell a segment passes through, in order, and reports the first
//! one accepted by a predicate. Used to find cells that cancel a long fall.

use glam::{DVec3, IVec3};
use strata_math::block_containing;
use strata_voxel::{CollisionWorld, FluidKind};

/// First accepted cell along a segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellHit {
    pub cell: IVec3,
    /// Normal of the face the segment entered through; zero for the start cell.
    pub face_normal: IVec3,
    /// Distance from the segment start to the entry point.
    pub distance: f64,
}

/// Walks the cells between `from` and `to` and returns the first for which
/// `accept` holds.
pub fn clip_cells(
    from: DVec3,
    to: DVec3,
    mut accept: impl FnMut(IVec3) -> bool,
) -> Option<CellHit> {
    let delta = to - from;
    let length = delta.length();
    let mut cell = block_containing(from);
    if accept(cell) {
        return Some(CellHit {
            cell,
            face_normal: IVec3::ZERO,
            distance: 0.0,
        });
    }
    if length == 0.0 {
        return None;
    }
    let dir = delta / length;
    let end = block_containing(to);

    let step = IVec3::new(step_of(dir.x), step_of(dir.y), step_of(dir.z));
    let t_delta = DVec3::new(safe_inv(dir.x.abs()), safe_inv(dir.y.abs()), safe_inv(dir.z.abs()));
    let sub = from - cell.as_dvec3();
    let mut t_max = DVec3::new(
        initial_t_max(sub.x, dir.x, t_delta.x),
        initial_t_max(sub.y, dir.y, t_delta.y),
        initial_t_max(sub.z, dir.z, t_delta.z),
    );

    while cell != end {
        let (t, normal) = if t_max.x < t_max.y && t_max.x < t_max.z {
            let t = t_max.x;
            t_max.x += t_delta.x;
            cell.x += step.x;
            (t, IVec3::new(-step.x, 0, 0))
        } else if t_max.y < t_max.z {
            let t = t_max.y;
            t_max.y += t_delta.y;
            cell.y += step.y;
            (t, IVec3::new(0, -step.y, 0))
        } else {
            let t = t_max.z;
            t_max.z += t_delta.z;
            cell.z += step.z;
            (t, IVec3::new(0, 0, -step.z))
        };
        if t > length {
            return None;
        }
        if accept(cell) {
            return Some(CellHit {
                cell,
                face_normal: normal,
                distance: t,
            });
        }
    }
    None
}

/// Returns true if the path from `from` to `to` crosses a block that cancels
/// fall damage or any water.
pub fn path_resets_fall(world: &dyn CollisionWorld, from: DVec3, to: DVec3) -> bool {
    clip_cells(from, to, |cell| {
        world.block_at(cell).resets_fall_damage || world.fluid_at(cell).is(FluidKind::Water)
    })
    .is_some()
}

fn step_of(d: f64) -> i32 {
    if d >= 0.0 { 1 } else { -1 }
}

/// Safely compute 1.0 / x, clamping to `f64::MAX` when x ≈ 0.
fn safe_inv(x: f64) -> f64 {
    if x < f64::EPSILON { f64::MAX } else { 1.0 / x }
}

fn initial_t_max(sub: f64, dir: f64, t_delta: f64) -> f64 {
    if dir > 0.0 {
        (1.0 - sub) * t_delta
    } else if dir < 0.0 {
        sub * t_delta
    } else {
        f64::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_target_cell_with_entry_normal() {
        let hit = clip_cells(
            DVec3::new(0.5, 0.5, 0.5),
            DVec3::new(10.5, 0.5, 0.5),
            |c| c.x == 5,
        )
        .unwrap();
        assert_eq!(hit.cell, IVec3::new(5, 0, 0));
        assert_eq!(hit.face_normal, IVec3::new(-1, 0, 0));
        assert!((hit.distance - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_stops_at_segment_end() {
        let hit = clip_cells(DVec3::new(0.5, 10.5, 0.5), DVec3::new(0.5, 7.5, 0.5), |c| c.y == 3);
        assert!(hit.is_none());
    }

    #[test]
    fn test_downward_ray_enters_from_top() {
        let hit = clip_cells(
            DVec3::new(0.5, 10.5, 0.5),
            DVec3::new(0.5, 0.5, 0.5),
            |c| c.y == 3,
        )
        .unwrap();
        assert_eq!(hit.face_normal, IVec3::new(0, 1, 0));
        assert!((hit.distance - 6.5).abs() < 1e-9);
    }

    #[test]
    fn test_start_cell_is_checked() {
        let hit = clip_cells(
            DVec3::new(-0.5, 0.5, 0.5),
            DVec3::new(3.0, 0.5, 0.5),
            |c| c.x == -1,
        )
        .unwrap();
        assert_eq!(hit.face_normal, IVec3::ZERO);
        assert_eq!(hit.distance, 0.0);
    }

    #[test]
    fn test_visits_every_cell_in_order() {
        let mut visited = Vec::new();
        clip_cells(DVec3::new(0.5, 0.5, 0.5), DVec3::new(3.5, 1.5, 0.5), |c| {
            visited.push(c);
            false
        });
        assert_eq!(visited.first(), Some(&IVec3::new(0, 0, 0)));
        assert_eq!(visited.last(), Some(&IVec3::new(3, 1, 0)));
        assert_eq!(visited.len(), 5);
    }
}
