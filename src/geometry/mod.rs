//! Interfaces implemented by the geometric objects handed to the managers.

pub use self::object::{
    BvKind, CollisionGeometry, CollisionObject, MeshModel, ObjectKind, OctreeGeometry,
    OctreeNodeRef, ShapeKind,
};
pub use self::occupancy_box::OccupancyBox;

mod object;
mod occupancy_box;
