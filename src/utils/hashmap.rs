//! A hash-map with a fast, fixed-seed hasher.

pub use hashbrown::hash_map::Entry;

/// Hashmap using [`hashbrown::HashMap`]
pub type HashMap<K, V> = hashbrown::hash_map::HashMap<K, V, foldhash::fast::FixedState>;
