//! Various unsorted geometrical and logical operators.

pub use self::obb::Obb;

pub mod hashmap;
mod obb;
