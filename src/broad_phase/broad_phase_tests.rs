use crate::bounding_volume::Aabb;
use crate::broad_phase::DynamicAabbTreeCollisionManager;
use crate::geometry::{
    CollisionGeometry, CollisionObject, ObjectKind, OctreeGeometry, OctreeNodeRef, ShapeKind,
};
use crate::math::{Isometry, Point, Real, Vector};
use std::cell::Cell;
use std::sync::Arc;

struct TestBox {
    half_extents: Vector<Real>,
    pose: Cell<Isometry<Real>>,
}

impl TestBox {
    fn unit_at(x: Real, y: Real, z: Real) -> Arc<Self> {
        Arc::new(Self {
            half_extents: Vector::repeat(0.5),
            pose: Cell::new(Isometry::translation(x, y, z)),
        })
    }

    fn move_to(&self, x: Real, y: Real, z: Real) {
        self.pose.set(Isometry::translation(x, y, z));
    }
}

impl CollisionGeometry for TestBox {
    fn object_kind(&self) -> ObjectKind {
        ObjectKind::Geometric
    }

    fn shape_kind(&self) -> ShapeKind {
        ShapeKind::Box
    }

    fn local_aabb(&self) -> Aabb {
        Aabb::from_half_extents(Point::origin(), self.half_extents)
    }
}

impl CollisionObject for TestBox {
    fn aabb(&self) -> Aabb {
        self.local_aabb().transform_by(&self.pose.get())
    }

    fn transform(&self) -> Isometry<Real> {
        self.pose.get()
    }

    fn geometry(&self) -> &dyn CollisionGeometry {
        self
    }
}

fn same_object(o: &dyn CollisionObject, arc: &Arc<TestBox>) -> bool {
    std::ptr::eq(o as *const dyn CollisionObject as *const (), Arc::as_ptr(arc) as *const ())
}

fn as_dyn(b: &Arc<TestBox>) -> Arc<dyn CollisionObject> {
    b.clone()
}

#[test]
fn single_object_self_collide_is_silent() {
    let a = TestBox::unit_at(0.0, 0.0, 0.0);
    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.register_object(as_dyn(&a));
    manager.setup();

    let mut pairs = 0;
    manager.self_collide(&mut |_, _| {
        pairs += 1;
        false
    });
    assert_eq!(pairs, 0);
}

#[test]
fn overlapping_pair_is_reported_once() {
    let a = TestBox::unit_at(0.0, 0.0, 0.0);
    let b = TestBox::unit_at(0.5, 0.0, 0.0);
    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.register_object(as_dyn(&a));
    manager.register_object(as_dyn(&b));
    manager.setup();

    let mut pairs = Vec::new();
    manager.self_collide(&mut |o1, o2| {
        pairs.push((same_object(o1, &a) || same_object(o2, &a), same_object(o1, &b) || same_object(o2, &b)));
        false
    });

    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0], (true, true));
}

#[test]
fn self_distance_reports_the_nearest_pair() {
    let a = TestBox::unit_at(0.0, 0.0, 0.0);
    let b = TestBox::unit_at(3.0, 0.0, 0.0);
    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.register_object(as_dyn(&a));
    manager.register_object(as_dyn(&b));
    manager.setup();

    let min_dist = manager.self_distance(&mut |o1, o2, min_dist| {
        let d = o1.aabb().distance_to_aabb(&o2.aabb());
        if d < *min_dist {
            *min_dist = d;
        }
        false
    });

    assert_relative_eq!(min_dist, 2.0);
}

#[test]
fn update_tracks_a_moved_object() {
    let a = TestBox::unit_at(0.0, 0.0, 0.0);
    let b = TestBox::unit_at(3.0, 0.0, 0.0);
    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.register_object(as_dyn(&a));
    manager.register_object(as_dyn(&b));
    manager.setup();

    let mut pairs = 0;
    manager.self_collide(&mut |_, _| {
        pairs += 1;
        false
    });
    assert_eq!(pairs, 0);

    b.move_to(0.5, 0.0, 0.0);
    manager.update_object(&as_dyn(&b));

    let mut pairs = 0;
    manager.self_collide(&mut |_, _| {
        pairs += 1;
        false
    });
    assert_eq!(pairs, 1);
}

#[test]
fn update_with_unchanged_aabb_leaves_the_tree_alone() {
    let a = TestBox::unit_at(0.0, 0.0, 0.0);
    let b = TestBox::unit_at(3.0, 0.0, 0.0);
    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.register_object(as_dyn(&a));
    manager.register_object(as_dyn(&b));
    manager.setup();

    let root_before = manager.tree().root();
    let height_before = manager.tree().max_height();

    manager.update_object(&as_dyn(&b));

    assert_eq!(manager.tree().root(), root_before);
    assert_eq!(manager.tree().max_height(), height_before);
    assert_eq!(manager.size(), 2);
}

#[test]
fn cross_manager_collision_reports_sided_pairs() {
    let a0 = TestBox::unit_at(0.0, 0.0, 0.0);
    let b0 = TestBox::unit_at(0.25, 0.0, 0.0);
    let b1 = TestBox::unit_at(5.0, 0.0, 0.0);

    let mut manager_a = DynamicAabbTreeCollisionManager::new();
    manager_a.register_object(as_dyn(&a0));
    manager_a.setup();

    let mut manager_b = DynamicAabbTreeCollisionManager::new();
    manager_b.register_objects(&[as_dyn(&b0), as_dyn(&b1)]);
    manager_b.setup();

    let mut pairs = Vec::new();
    manager_a.collide_manager(&manager_b, &mut |o1, o2| {
        pairs.push((same_object(o1, &a0), same_object(o2, &b0)));
        false
    });

    assert_eq!(pairs, vec![(true, true)]);
}

#[test]
fn cross_manager_distance() {
    let a0 = TestBox::unit_at(0.0, 0.0, 0.0);
    let b0 = TestBox::unit_at(4.0, 0.0, 0.0);
    let b1 = TestBox::unit_at(9.0, 0.0, 0.0);

    let mut manager_a = DynamicAabbTreeCollisionManager::new();
    manager_a.register_object(as_dyn(&a0));
    let mut manager_b = DynamicAabbTreeCollisionManager::new();
    manager_b.register_objects(&[as_dyn(&b0), as_dyn(&b1)]);
    manager_a.setup();
    manager_b.setup();

    let min_dist = manager_a.distance_manager(&manager_b, &mut |o1, o2, min_dist| {
        let d = o1.aabb().distance_to_aabb(&o2.aabb());
        if d < *min_dist {
            *min_dist = d;
        }
        false
    });

    assert_relative_eq!(min_dist, 3.0);
}

#[test]
fn register_unregister_round_trip_restores_queries() {
    let a = TestBox::unit_at(0.0, 0.0, 0.0);
    let b = TestBox::unit_at(0.5, 0.0, 0.0);
    let c = TestBox::unit_at(0.25, 0.25, 0.0);

    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.register_object(as_dyn(&a));
    manager.register_object(as_dyn(&b));
    manager.setup();

    let mut before = 0;
    manager.self_collide(&mut |_, _| {
        before += 1;
        false
    });

    manager.register_object(as_dyn(&c));
    manager.unregister_object(&as_dyn(&c));
    assert_eq!(manager.size(), 2);

    let mut after = 0;
    manager.self_collide(&mut |_, _| {
        after += 1;
        false
    });
    assert_eq!(before, after);

    // Unregistering an unknown object is a no-op.
    manager.unregister_object(&as_dyn(&c));
    assert_eq!(manager.size(), 2);
}

#[test]
fn bulk_registration_builds_the_whole_population() {
    let boxes: Vec<_> = (0..8)
        .map(|i| TestBox::unit_at(i as Real * 0.6, 0.0, 0.0))
        .collect();
    let objs: Vec<Arc<dyn CollisionObject>> = boxes.iter().map(as_dyn).collect();

    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.tree_init_level = 4;
    manager.register_objects(&objs);
    manager.setup();

    assert_eq!(manager.size(), 8);
    assert_eq!(manager.objects().len(), 8);
    manager.tree().assert_well_formed();

    // Boxes spaced 0.6 apart only overlap their direct neighbors.
    let mut pairs = 0;
    manager.self_collide(&mut |_, _| {
        pairs += 1;
        false
    });
    assert_eq!(pairs, 7);
}

#[test]
fn collide_object_supports_early_termination() {
    let boxes: Vec<_> = (0..6)
        .map(|i| TestBox::unit_at(i as Real * 0.2, 0.0, 0.0))
        .collect();
    let objs: Vec<Arc<dyn CollisionObject>> = boxes.iter().map(as_dyn).collect();

    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.register_objects(&objs);
    manager.setup();

    let query = TestBox::unit_at(0.0, 0.0, 0.0);
    let mut visits = 0;
    manager.collide_object(&*query, &mut |_, _| {
        visits += 1;
        true
    });
    assert_eq!(visits, 1);
}

#[test]
fn distance_object_lower_bound_holds_for_the_whole_population() {
    let boxes: Vec<_> = (0..6)
        .map(|i| TestBox::unit_at(4.0 + i as Real * 2.0, 0.0, 0.0))
        .collect();
    let objs: Vec<Arc<dyn CollisionObject>> = boxes.iter().map(as_dyn).collect();

    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.register_objects(&objs);
    manager.setup();

    let query = TestBox::unit_at(0.0, 0.0, 0.0);
    let min_dist = manager.distance_object(&*query, &mut |o1, o2, min_dist| {
        let d = o1.aabb().distance_to_aabb(&o2.aabb());
        if d < *min_dist {
            *min_dist = d;
        }
        false
    });

    // The nearest box sits at x = 4, so the gap is 4 - 1 = 3.
    assert_relative_eq!(min_dist, 3.0);
    for b in &boxes {
        assert!(min_dist <= query.aabb().distance_to_aabb(&b.aabb()) + 1.0e-12);
    }
}

#[test]
fn setup_repairs_a_degenerate_population() {
    // One-by-one registration of colinear boxes produces a badly skewed
    // tree; `setup` must bring it back under the balance target.
    let boxes: Vec<_> = (0..128)
        .map(|i| TestBox::unit_at(i as Real * 3.0, 0.0, 0.0))
        .collect();

    let mut manager = DynamicAabbTreeCollisionManager::new();
    for b in &boxes {
        manager.register_object(as_dyn(b));
    }
    manager.setup();

    manager.tree().assert_well_formed();
    let bound = (128.0_f64).log2().ceil() as usize + manager.max_tree_nonbalanced_level;
    assert!(
        manager.tree().max_height() <= bound,
        "height = {}, bound = {bound}",
        manager.tree().max_height()
    );
}

/*
 * Octree queries.
 */

struct MockOctree {
    bounds: Aabb,
    occupied_child: usize,
    occupancy: Real,
    default_occupancy: Real,
    pose: Cell<Isometry<Real>>,
}

impl MockOctree {
    fn new(occupied_child: usize) -> Arc<Self> {
        Arc::new(Self {
            bounds: Aabb::from_half_extents(Point::origin(), Vector::repeat(2.0)),
            occupied_child,
            occupancy: 0.9,
            default_occupancy: 0.5,
            pose: Cell::new(Isometry::identity()),
        })
    }
}

const ROOT: OctreeNodeRef = OctreeNodeRef(0);

impl OctreeGeometry for MockOctree {
    fn root(&self) -> Option<OctreeNodeRef> {
        Some(ROOT)
    }

    fn root_aabb(&self) -> Aabb {
        self.bounds
    }

    fn node_has_children(&self, node: OctreeNodeRef) -> bool {
        node == ROOT
    }

    fn node_child_exists(&self, node: OctreeNodeRef, i: usize) -> bool {
        node == ROOT && i == self.occupied_child
    }

    fn node_child(&self, _node: OctreeNodeRef, i: usize) -> OctreeNodeRef {
        OctreeNodeRef(1 + i)
    }

    fn is_node_free(&self, _node: OctreeNodeRef) -> bool {
        false
    }

    fn is_node_occupied(&self, _node: OctreeNodeRef) -> bool {
        true
    }

    fn node_occupancy(&self, _node: OctreeNodeRef) -> Real {
        self.occupancy
    }

    fn occupancy_threshold(&self) -> Real {
        0.7
    }

    fn default_occupancy(&self) -> Real {
        self.default_occupancy
    }
}

impl CollisionGeometry for MockOctree {
    fn object_kind(&self) -> ObjectKind {
        ObjectKind::Octree
    }

    fn shape_kind(&self) -> ShapeKind {
        ShapeKind::Octree
    }

    fn local_aabb(&self) -> Aabb {
        self.bounds
    }

    fn as_octree(&self) -> Option<&dyn OctreeGeometry> {
        Some(self)
    }
}

impl CollisionObject for MockOctree {
    fn aabb(&self) -> Aabb {
        self.bounds.transform_by(&self.pose.get())
    }

    fn transform(&self) -> Isometry<Real> {
        self.pose.get()
    }

    fn geometry(&self) -> &dyn CollisionGeometry {
        self
    }
}

#[test]
fn octree_collide_synthesises_a_box_from_the_occupied_cell() {
    // Child octant 0 covers the all-lower corner [-2, 0]^3.
    let octree = MockOctree::new(0);
    let inside = TestBox::unit_at(-1.0, -1.0, -1.0);
    let outside = TestBox::unit_at(1.5, 1.5, 1.5);

    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.register_object(as_dyn(&inside));
    manager.register_object(as_dyn(&outside));
    manager.setup();
    manager.octree_as_geometry_collide = false;

    let mut hits = Vec::new();
    manager.collide_object(&*octree, &mut |o1, o2| {
        hits.push((
            same_object(o1, &inside),
            o2.geometry().shape_kind(),
            o2.geometry().cost_density(),
            o2.aabb(),
        ));
        false
    });

    assert_eq!(hits.len(), 1);
    let (is_inside, kind, cost, bv) = &hits[0];
    assert!(*is_inside);
    assert_eq!(*kind, ShapeKind::Box);
    assert_relative_eq!(*cost, 0.9);
    assert_relative_eq!(bv.center().x, -1.0);
    assert_relative_eq!(bv.half_extents().x, 1.0);
}

#[test]
fn octree_collide_takes_the_rotated_path() {
    let octree = MockOctree::new(0);
    // A small rotation forces the general OBB path; the box deep inside the
    // occupied octant must still be reported.
    octree.pose.set(Isometry::new(
        Vector::zeros(),
        Vector::new(0.0, 0.0, 0.3),
    ));
    let inside = TestBox::unit_at(-1.0, -1.0, -1.0);

    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.register_object(as_dyn(&inside));
    manager.setup();
    manager.octree_as_geometry_collide = false;

    let mut hits = 0;
    manager.collide_object(&*octree, &mut |_, _| {
        hits += 1;
        false
    });
    assert_eq!(hits, 1);
}

#[test]
fn octree_absent_cells_materialise_when_default_space_is_not_free() {
    let octree = Arc::new(MockOctree {
        bounds: Aabb::from_half_extents(Point::origin(), Vector::repeat(2.0)),
        occupied_child: 0,
        occupancy: 0.9,
        // At or above the occupancy threshold: absent space is not free.
        default_occupancy: 0.8,
        pose: Cell::new(Isometry::identity()),
    });

    // This box overlaps only absent octants (all-upper corner).
    let roaming = TestBox::unit_at(1.0, 1.0, 1.0);

    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.register_object(as_dyn(&roaming));
    manager.setup();
    manager.octree_as_geometry_collide = false;

    let mut costs = Vec::new();
    manager.collide_object(&*octree, &mut |_, o2| {
        costs.push(o2.geometry().cost_density());
        false
    });

    assert!(!costs.is_empty());
    for cost in costs {
        assert_relative_eq!(cost, 0.8);
    }
}

#[test]
fn octree_absent_cells_prune_when_default_space_is_free() {
    let octree = MockOctree::new(0);
    let roaming = TestBox::unit_at(1.0, 1.0, 1.0);

    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.register_object(as_dyn(&roaming));
    manager.setup();
    manager.octree_as_geometry_collide = false;

    let mut hits = 0;
    manager.collide_object(&*octree, &mut |_, _| {
        hits += 1;
        false
    });
    assert_eq!(hits, 0);
}

#[test]
fn octree_distance_descends_into_the_occupied_cell() {
    let octree = MockOctree::new(0);
    let probe = TestBox::unit_at(3.0, -1.0, -1.0);

    let mut manager = DynamicAabbTreeCollisionManager::new();
    manager.register_object(as_dyn(&probe));
    manager.setup();

    let min_dist = manager.distance_object(&*octree, &mut |o1, o2, min_dist| {
        let d = o1.aabb().distance_to_aabb(&o2.aabb());
        if d < *min_dist {
            *min_dist = d;
        }
        false
    });

    // Occupied octant spans x in [-2, 0]; the probe AABB starts at x = 2.5.
    assert_relative_eq!(min_dist, 2.5);
}
