//! Recursive traversal kernels shared by the manager queries.
//!
//! All kernels return `true` when the user callback asked for the walk to
//! stop; callers propagate that upward.

use super::manager::DynamicAabbTreeCollisionManager as Manager;
use super::{CollisionCallback, DistanceCallback};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::geometry::CollisionObject;
use crate::math::Real;
use crate::partitioning::dynamic_tree::select;

/*
 * One tree against one external object.
 */

pub(super) fn collide_object_recurse(
    mgr: &Manager,
    node: u32,
    obj: &dyn CollisionObject,
    obj_aabb: &Aabb,
    callback: &mut CollisionCallback,
) -> bool {
    let n = mgr.tree.node(node);

    if !n.bv.intersects(obj_aabb) {
        return false;
    }

    if n.is_leaf() {
        return callback(mgr.object(n.payload), obj);
    }

    let [c0, c1] = n.children;
    let first = select(obj_aabb, &mgr.tree.node(c0).bv, &mgr.tree.node(c1).bv);
    let children = [c0, c1];

    if collide_object_recurse(mgr, children[first], obj, obj_aabb, callback) {
        return true;
    }
    collide_object_recurse(mgr, children[1 - first], obj, obj_aabb, callback)
}

pub(super) fn distance_object_recurse(
    mgr: &Manager,
    node: u32,
    obj: &dyn CollisionObject,
    obj_aabb: &Aabb,
    callback: &mut DistanceCallback,
    min_dist: &mut Real,
) -> bool {
    let n = mgr.tree.node(node);

    if n.is_leaf() {
        return callback(mgr.object(n.payload), obj, min_dist);
    }

    let [c0, c1] = n.children;
    let d0 = obj_aabb.distance_to_aabb(&mgr.tree.node(c0).bv);
    let d1 = obj_aabb.distance_to_aabb(&mgr.tree.node(c1).bv);

    // Visit the closer child first; prune children past the current bound.
    let order = if d1 < d0 { [(d1, c1), (d0, c0)] } else { [(d0, c0), (d1, c1)] };

    for (d, child) in order {
        if d < *min_dist && distance_object_recurse(mgr, child, obj, obj_aabb, callback, min_dist) {
            return true;
        }
    }

    false
}

/*
 * One tree against another (possibly the same) tree.
 */

pub(super) fn collide_pair_recurse(
    m1: &Manager,
    node1: u32,
    m2: &Manager,
    node2: u32,
    callback: &mut CollisionCallback,
) -> bool {
    let n1 = m1.tree.node(node1);
    let n2 = m2.tree.node(node2);

    if !n1.bv.intersects(&n2.bv) {
        return false;
    }

    if n1.is_leaf() && n2.is_leaf() {
        return callback(m1.object(n1.payload), m2.object(n2.payload));
    }

    // Descend the internal side with the larger volume, keeping the other
    // node fixed.
    if n2.is_leaf() || (!n1.is_leaf() && n1.bv.volume() > n2.bv.volume()) {
        if collide_pair_recurse(m1, n1.children[0], m2, node2, callback) {
            return true;
        }
        collide_pair_recurse(m1, n1.children[1], m2, node2, callback)
    } else {
        if collide_pair_recurse(m1, node1, m2, n2.children[0], callback) {
            return true;
        }
        collide_pair_recurse(m1, node1, m2, n2.children[1], callback)
    }
}

pub(super) fn distance_pair_recurse(
    m1: &Manager,
    node1: u32,
    m2: &Manager,
    node2: u32,
    callback: &mut DistanceCallback,
    min_dist: &mut Real,
) -> bool {
    let n1 = m1.tree.node(node1);
    let n2 = m2.tree.node(node2);

    if n1.is_leaf() && n2.is_leaf() {
        return callback(m1.object(n1.payload), m2.object(n2.payload), min_dist);
    }

    if n2.is_leaf() || (!n1.is_leaf() && n1.bv.volume() > n2.bv.volume()) {
        let [c0, c1] = n1.children;
        let d0 = n2.bv.distance_to_aabb(&m1.tree.node(c0).bv);
        let d1 = n2.bv.distance_to_aabb(&m1.tree.node(c1).bv);
        let order = if d1 < d0 { [(d1, c1), (d0, c0)] } else { [(d0, c0), (d1, c1)] };

        for (d, child) in order {
            if d < *min_dist && distance_pair_recurse(m1, child, m2, node2, callback, min_dist) {
                return true;
            }
        }
    } else {
        let [c0, c1] = n2.children;
        let d0 = n1.bv.distance_to_aabb(&m2.tree.node(c0).bv);
        let d1 = n1.bv.distance_to_aabb(&m2.tree.node(c1).bv);
        let order = if d1 < d0 { [(d1, c1), (d0, c0)] } else { [(d0, c0), (d1, c1)] };

        for (d, child) in order {
            if d < *min_dist && distance_pair_recurse(m1, node1, m2, child, callback, min_dist) {
                return true;
            }
        }
    }

    false
}

/*
 * One tree against itself.
 */

pub(super) fn self_collide_recurse(
    mgr: &Manager,
    node: u32,
    callback: &mut CollisionCallback,
) -> bool {
    let n = mgr.tree.node(node);
    if n.is_leaf() {
        return false;
    }

    if self_collide_recurse(mgr, n.children[0], callback) {
        return true;
    }
    if self_collide_recurse(mgr, n.children[1], callback) {
        return true;
    }
    collide_pair_recurse(mgr, n.children[0], mgr, n.children[1], callback)
}

pub(super) fn self_distance_recurse(
    mgr: &Manager,
    node: u32,
    callback: &mut DistanceCallback,
    min_dist: &mut Real,
) -> bool {
    let n = mgr.tree.node(node);
    if n.is_leaf() {
        return false;
    }

    if self_distance_recurse(mgr, n.children[0], callback, min_dist) {
        return true;
    }
    if self_distance_recurse(mgr, n.children[1], callback, min_dist) {
        return true;
    }
    distance_pair_recurse(mgr, n.children[0], mgr, n.children[1], callback, min_dist)
}
