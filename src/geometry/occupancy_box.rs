use crate::bounding_volume::Aabb;
use crate::geometry::{CollisionGeometry, CollisionObject, ObjectKind, ShapeKind};
use crate::math::{Isometry, Point, Real, Translation, Vector};

/// A box synthesised from one octree cell during an octree traversal.
///
/// These boxes only exist for the duration of a single callback invocation:
/// the traversal builds one on its stack, hands it to the callback by
/// reference, and drops it when the callback returns.
#[derive(Clone, Debug)]
pub struct OccupancyBox {
    /// Half-extents of the box.
    pub half_extents: Vector<Real>,
    /// World-space pose of the box.
    pub pose: Isometry<Real>,
    /// Occupancy probability of the octree cell this box was built from.
    pub cost_density: Real,
    /// Occupancy threshold of the octree this box was built from.
    pub threshold_occupied: Real,
}

impl OccupancyBox {
    /// Builds the box covering `bv` transformed by `tf`.
    pub fn from_aabb(bv: &Aabb, tf: &Isometry<Real>) -> Self {
        Self {
            half_extents: bv.half_extents(),
            pose: tf * Translation::from(bv.center().coords),
            cost_density: 0.0,
            threshold_occupied: 1.0,
        }
    }
}

impl CollisionGeometry for OccupancyBox {
    fn object_kind(&self) -> ObjectKind {
        ObjectKind::Geometric
    }

    fn shape_kind(&self) -> ShapeKind {
        ShapeKind::Box
    }

    fn local_aabb(&self) -> Aabb {
        Aabb::from_half_extents(Point::origin(), self.half_extents)
    }

    fn cost_density(&self) -> Real {
        self.cost_density
    }

    fn threshold_occupied(&self) -> Real {
        self.threshold_occupied
    }
}

impl CollisionObject for OccupancyBox {
    fn aabb(&self) -> Aabb {
        self.local_aabb().transform_by(&self.pose)
    }

    fn transform(&self) -> Isometry<Real> {
        self.pose
    }

    fn geometry(&self) -> &dyn CollisionGeometry {
        self
    }
}
