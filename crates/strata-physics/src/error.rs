//! Error types for movement resolution and ledger updates.

use std::error::Error as StdError;

use glam::{DVec3, IVec3};
use strata_math::Aabb;
use strata_voxel::EntityId;
use thiserror::Error;

/// Failure reported by an [`InsideBlockHandler`](crate::InsideBlockHandler).
#[derive(Debug, Error)]
pub enum BlockEffectError {
    /// The block's state could not be interpreted by the handler.
    #[error("invalid block state for `{block}` at {pos}")]
    InvalidState { block: String, pos: IVec3 },
    /// Any other failure raised by a custom handler.
    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

/// Errors that abort an entity's move for the current tick.
///
/// Every variant is fatal to the caller's tick.
#[derive(Debug, Error)]
pub enum MovementError {
    /// A block side effect failed while the entity was overlapping it.
    #[error(
        "entity {entity} colliding with block `{block}` at {block_pos} \
         (entity position {position}, box {bounding_box:?})"
    )]
    InsideBlock {
        entity: EntityId,
        block: String,
        block_pos: IVec3,
        position: DVec3,
        bounding_box: Aabb,
        #[source]
        source: BlockEffectError,
    },
}

/// Rejected writes to the position/rotation ledger.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("non-finite position ({x}, {y}, {z})")]
    NonFinite { x: f64, y: f64, z: f64 },
    #[error("non-finite rotation {0}")]
    NonFiniteRotation(f32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_block_error_reports_position_and_source() {
        let err = MovementError::InsideBlock {
            entity: 7,
            block: "cobweb".to_string(),
            block_pos: IVec3::new(1, 2, 3),
            position: DVec3::new(1.5, 2.0, 3.5),
            bounding_box: Aabb::from_base(DVec3::new(1.5, 2.0, 3.5), 0.6, 1.8),
            source: BlockEffectError::InvalidState {
                block: "cobweb".to_string(),
                pos: IVec3::new(1, 2, 3),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("entity 7"));
        assert!(msg.contains("cobweb"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_ledger_error_display() {
        let err = LedgerError::NonFinite {
            x: f64::NAN,
            y: 0.0,
            z: 1.0,
        };
        assert!(err.to_string().contains("NaN"));
    }
}
