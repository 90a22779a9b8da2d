//! Spatial partitioning tools.

pub use self::dynamic_tree::DynamicTree;

pub(crate) mod dynamic_tree;
