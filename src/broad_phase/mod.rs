//! Broad-phase collision management.

pub use self::manager::DynamicAabbTreeCollisionManager;

use crate::geometry::CollisionObject;
use crate::math::Real;

mod kernels;
mod manager;
mod octree;

#[cfg(test)]
mod broad_phase_tests;

/// Callback run on every candidate pair produced by a collision query.
///
/// Returning `true` aborts the traversal. Per-query user state lives in the
/// closure's captures.
pub type CollisionCallback<'a> = dyn FnMut(&dyn CollisionObject, &dyn CollisionObject) -> bool + 'a;

/// Callback run on every candidate pair produced by a distance query.
///
/// The callback may lower `min_dist`; branches whose bounding-volume distance
/// reaches it are pruned. Returning `true` aborts the traversal.
pub type DistanceCallback<'a> =
    dyn FnMut(&dyn CollisionObject, &dyn CollisionObject, &mut Real) -> bool + 'a;
