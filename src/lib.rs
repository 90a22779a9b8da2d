/*!
ambit3d
========

**ambit3d** is a 3-dimensional collision-management library written with
the rust programming language. It provides a self-balancing dynamic AABB
tree for broad-phase collision and distance queries over a mutable
population of objects, and a dispatch layer for continuous (time-of-contact)
collision checking between moving geometries.

*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![deny(unused_results)]
#![warn(missing_docs)]
#![warn(unused_imports)]
#![allow(missing_copy_implementations)]
#![allow(clippy::too_many_arguments)] // Traversal kernels thread a lot of state.
#![allow(clippy::module_inception)]

#[macro_use]
extern crate approx;

extern crate num_traits as num;

pub extern crate nalgebra as na;

pub mod bounding_volume;
pub mod broad_phase;
pub mod geometry;
pub mod motion;
pub mod partitioning;
pub mod query;
pub mod utils;

/// Aliases for the mathematical types used throughout this crate.
pub mod math {
    pub use na::{Isometry3, Matrix3, Point3, Translation3, UnitQuaternion, UnitVector3, Vector3};

    /// The scalar type used throughout this crate.
    pub use f64 as Real;

    /// The default tolerance used for geometric operations.
    pub const DEFAULT_EPSILON: Real = Real::EPSILON;

    /// The dimension of the space.
    pub const DIM: usize = 3;

    /// The point type.
    pub use Point3 as Point;

    /// The vector type.
    pub use Vector3 as Vector;

    /// The unit vector type.
    pub use UnitVector3 as UnitVector;

    /// The matrix type.
    pub use Matrix3 as Matrix;

    /// The transformation matrix type.
    pub use Isometry3 as Isometry;

    /// The rotation type.
    pub type Rotation<N> = UnitQuaternion<N>;

    /// The translation type.
    pub use Translation3 as Translation;
}
