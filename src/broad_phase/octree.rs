//! Traversal kernels pitting the tree against an octree occupancy map.
//!
//! Octree nodes do not carry bounding volumes: the volume of the current
//! octree node travels through the recursion as an explicit parameter, and
//! child volumes are derived by halving it along the three axes. Absent
//! children stand for space at the octree's default occupancy, so the
//! recursion keeps descending the tree side through them unless the octree
//! treats absent space as free.

use super::manager::DynamicAabbTreeCollisionManager as Manager;
use super::{CollisionCallback, DistanceCallback};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::geometry::{OccupancyBox, OctreeGeometry, OctreeNodeRef};
use crate::math::{Isometry, Real, UnitQuaternion, Vector};
use crate::utils::Obb;

/// The volume covered by child `i` (in `0..8`) of an octree node covering
/// `bv`. Bit `k` of `i` selects the upper half along axis `k`.
fn child_octant(bv: &Aabb, i: usize) -> Aabb {
    let center = bv.center();
    let mut mins = bv.mins;
    let mut maxs = bv.maxs;

    for axis in 0..3 {
        if i & (1 << axis) != 0 {
            mins[axis] = center[axis];
        } else {
            maxs[axis] = center[axis];
        }
    }

    Aabb::new(mins, maxs)
}

fn obb_overlap(bv1: &Aabb, bv2: &Aabb, tf2: &Isometry<Real>) -> bool {
    let obb1 = Obb::from_aabb(bv1, &Isometry::identity());
    let obb2 = Obb::from_aabb(bv2, tf2);
    obb1.intersects(&obb2)
}

fn occupancy_box(
    bv2: &Aabb,
    tf2: &Isometry<Real>,
    cost_density: Real,
    threshold_occupied: Real,
) -> OccupancyBox {
    let mut synthesised = OccupancyBox::from_aabb(bv2, tf2);
    synthesised.cost_density = cost_density;
    synthesised.threshold_occupied = threshold_occupied;
    synthesised
}

/// Entry point for octree collision descent: rotation-free transforms take a
/// translation-only fast path.
pub(super) fn collide_octree(
    mgr: &Manager,
    node1: u32,
    octree: &dyn OctreeGeometry,
    node2: Option<OctreeNodeRef>,
    bv2: &Aabb,
    tf2: &Isometry<Real>,
    callback: &mut CollisionCallback,
) -> bool {
    if relative_eq!(tf2.rotation, UnitQuaternion::identity()) {
        collide_octree_translated(
            mgr,
            node1,
            octree,
            node2,
            bv2,
            &tf2.translation.vector,
            callback,
        )
    } else {
        collide_octree_general(mgr, node1, octree, node2, bv2, tf2, callback)
    }
}

fn collide_octree_general(
    mgr: &Manager,
    node1: u32,
    octree: &dyn OctreeGeometry,
    node2: Option<OctreeNodeRef>,
    bv2: &Aabb,
    tf2: &Isometry<Real>,
    callback: &mut CollisionCallback,
) -> bool {
    let n1 = mgr.tree.node(node1);

    let Some(node2) = node2 else {
        // Absent subtree: space at the octree's default occupancy. Still
        // descend the tree side to materialise potential overlaps.
        if octree.is_default_free() {
            return false;
        }

        if n1.is_leaf() {
            let obj1 = mgr.object(n1.payload);
            if !obj1.is_free() && obb_overlap(&n1.bv, bv2, tf2) {
                let synthesised = occupancy_box(
                    bv2,
                    tf2,
                    octree.default_occupancy(),
                    octree.occupancy_threshold(),
                );
                return callback(obj1, &synthesised);
            }
            return false;
        }

        if collide_octree_general(mgr, n1.children[0], octree, None, bv2, tf2, callback) {
            return true;
        }
        return collide_octree_general(mgr, n1.children[1], octree, None, bv2, tf2, callback);
    };

    if n1.is_leaf() && !octree.node_has_children(node2) {
        let obj1 = mgr.object(n1.payload);
        if !octree.is_node_free(node2) && !obj1.is_free() && obb_overlap(&n1.bv, bv2, tf2) {
            let synthesised = occupancy_box(
                bv2,
                tf2,
                octree.node_occupancy(node2),
                octree.occupancy_threshold(),
            );
            return callback(obj1, &synthesised);
        }
        return false;
    }

    if octree.is_node_free(node2) || !obb_overlap(&n1.bv, bv2, tf2) {
        return false;
    }

    if !octree.node_has_children(node2) || (!n1.is_leaf() && n1.bv.volume() > bv2.volume()) {
        if collide_octree_general(mgr, n1.children[0], octree, Some(node2), bv2, tf2, callback) {
            return true;
        }
        collide_octree_general(mgr, n1.children[1], octree, Some(node2), bv2, tf2, callback)
    } else {
        for i in 0..8 {
            let child_bv = child_octant(bv2, i);
            let child = octree
                .node_child_exists(node2, i)
                .then(|| octree.node_child(node2, i));

            if collide_octree_general(mgr, node1, octree, child, &child_bv, tf2, callback) {
                return true;
            }
        }
        false
    }
}

fn collide_octree_translated(
    mgr: &Manager,
    node1: u32,
    octree: &dyn OctreeGeometry,
    node2: Option<OctreeNodeRef>,
    bv2: &Aabb,
    translation2: &Vector<Real>,
    callback: &mut CollisionCallback,
) -> bool {
    let n1 = mgr.tree.node(node1);
    let tf2 = Isometry::from(crate::math::Translation::from(*translation2));

    let Some(node2) = node2 else {
        if octree.is_default_free() {
            return false;
        }

        if n1.is_leaf() {
            let obj1 = mgr.object(n1.payload);
            if !obj1.is_free() && n1.bv.intersects(&bv2.translated(translation2)) {
                let synthesised = occupancy_box(
                    bv2,
                    &tf2,
                    octree.default_occupancy(),
                    octree.occupancy_threshold(),
                );
                return callback(obj1, &synthesised);
            }
            return false;
        }

        if collide_octree_translated(
            mgr,
            n1.children[0],
            octree,
            None,
            bv2,
            translation2,
            callback,
        ) {
            return true;
        }
        return collide_octree_translated(
            mgr,
            n1.children[1],
            octree,
            None,
            bv2,
            translation2,
            callback,
        );
    };

    if n1.is_leaf() && !octree.node_has_children(node2) {
        let obj1 = mgr.object(n1.payload);
        if !octree.is_node_free(node2)
            && !obj1.is_free()
            && n1.bv.intersects(&bv2.translated(translation2))
        {
            let synthesised = occupancy_box(
                bv2,
                &tf2,
                octree.node_occupancy(node2),
                octree.occupancy_threshold(),
            );
            return callback(obj1, &synthesised);
        }
        return false;
    }

    if octree.is_node_free(node2) || !n1.bv.intersects(&bv2.translated(translation2)) {
        return false;
    }

    if !octree.node_has_children(node2) || (!n1.is_leaf() && n1.bv.volume() > bv2.volume()) {
        if collide_octree_translated(
            mgr,
            n1.children[0],
            octree,
            Some(node2),
            bv2,
            translation2,
            callback,
        ) {
            return true;
        }
        collide_octree_translated(
            mgr,
            n1.children[1],
            octree,
            Some(node2),
            bv2,
            translation2,
            callback,
        )
    } else {
        for i in 0..8 {
            let child_bv = child_octant(bv2, i);
            let child = octree
                .node_child_exists(node2, i)
                .then(|| octree.node_child(node2, i));

            if collide_octree_translated(
                mgr,
                node1,
                octree,
                child,
                &child_bv,
                translation2,
                callback,
            ) {
                return true;
            }
        }
        false
    }
}

/// Octree distance descent. Only existing, occupied octree children take part;
/// absent space never lowers a distance bound.
pub(super) fn distance_octree_recurse(
    mgr: &Manager,
    node1: u32,
    octree: &dyn OctreeGeometry,
    node2: OctreeNodeRef,
    bv2: &Aabb,
    tf2: &Isometry<Real>,
    callback: &mut DistanceCallback,
    min_dist: &mut Real,
) -> bool {
    let n1 = mgr.tree.node(node1);

    if n1.is_leaf() && !octree.node_has_children(node2) {
        if octree.is_node_occupied(node2) {
            let synthesised = occupancy_box(
                bv2,
                tf2,
                octree.node_occupancy(node2),
                octree.occupancy_threshold(),
            );
            return callback(mgr.object(n1.payload), &synthesised, min_dist);
        }
        return false;
    }

    if !octree.is_node_occupied(node2) {
        return false;
    }

    if !octree.node_has_children(node2) || (!n1.is_leaf() && n1.bv.volume() > bv2.volume()) {
        let aabb2 = bv2.transform_by(tf2);
        let [c0, c1] = n1.children;
        let d0 = aabb2.distance_to_aabb(&mgr.tree.node(c0).bv);
        let d1 = aabb2.distance_to_aabb(&mgr.tree.node(c1).bv);
        let order = if d1 < d0 { [(d1, c1), (d0, c0)] } else { [(d0, c0), (d1, c1)] };

        for (d, child) in order {
            if d < *min_dist
                && distance_octree_recurse(mgr, child, octree, node2, bv2, tf2, callback, min_dist)
            {
                return true;
            }
        }
    } else {
        for i in 0..8 {
            if !octree.node_child_exists(node2, i) {
                continue;
            }

            let child = octree.node_child(node2, i);
            let child_bv = child_octant(bv2, i);
            let d = n1.bv.distance_to_aabb(&child_bv.transform_by(tf2));

            if d < *min_dist
                && distance_octree_recurse(
                    mgr, node1, octree, child, &child_bv, tf2, callback, min_dist,
                )
            {
                return true;
            }
        }
    }

    false
}
