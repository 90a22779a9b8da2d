use super::{kernels, octree, CollisionCallback, DistanceCallback};
use crate::geometry::{CollisionObject, ObjectKind};
use crate::math::Real;
use crate::partitioning::DynamicTree;
use crate::utils::hashmap::HashMap;
use std::sync::Arc;
use vec_map::VecMap;

pub(super) struct ObjectSlot {
    pub object: Arc<dyn CollisionObject>,
    pub leaf: u32,
}

/// A broad-phase manager based on a self-balancing dynamic AABB tree.
///
/// Objects are registered once, bound to a tree leaf, and may then move
/// freely: the various `update` methods re-synchronise the tree with the live
/// objects. Queries run pairwise overlap or nearest-pair distance tests
/// between one external object and the population, the population against
/// itself, or two managed populations.
///
/// A manager shares its objects with the caller but never owns them; it owns
/// only the tree leaves bound to them.
pub struct DynamicAabbTreeCollisionManager {
    pub(super) tree: DynamicTree,
    pub(super) objects: VecMap<ObjectSlot>,
    table: HashMap<usize, u32>,
    free_slots: Vec<u32>,
    setup_done: bool,

    /// Imbalance threshold above which `setup` prefers a top-down rebuild
    /// over incremental balancing.
    pub max_tree_nonbalanced_level: usize,
    /// Number of passes run by each incremental balancing.
    pub tree_incremental_balance_pass: usize,
    /// Median-partitioning depth used when bulk-registering objects.
    /// 0 leaves the depth unbounded.
    pub tree_init_level: usize,
    /// Whether collision queries treat an octree query object monolithically
    /// through its bounding box instead of descending its subdivision.
    pub octree_as_geometry_collide: bool,
    /// Whether distance queries treat an octree query object monolithically
    /// through its bounding box instead of descending its subdivision.
    pub octree_as_geometry_distance: bool,
}

fn address_of(obj: &Arc<dyn CollisionObject>) -> usize {
    Arc::as_ptr(obj) as *const () as usize
}

impl Default for DynamicAabbTreeCollisionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicAabbTreeCollisionManager {
    /// An empty manager with the default configuration.
    pub fn new() -> Self {
        Self {
            tree: DynamicTree::new(),
            objects: VecMap::new(),
            table: HashMap::default(),
            free_slots: Vec::new(),
            setup_done: false,
            max_tree_nonbalanced_level: 10,
            tree_incremental_balance_pass: 10,
            tree_init_level: 0,
            // From experiment, this is the optimal setting.
            octree_as_geometry_collide: true,
            octree_as_geometry_distance: false,
        }
    }

    /// Leaf-count threshold under which top-down rebuilds fall back to
    /// incremental balancing.
    pub fn tree_topdown_balance_threshold(&self) -> usize {
        self.tree.topdown_balance_threshold
    }

    /// Sets the leaf-count threshold under which top-down rebuilds fall back
    /// to incremental balancing.
    pub fn set_tree_topdown_balance_threshold(&mut self, threshold: usize) {
        self.tree.topdown_balance_threshold = threshold;
    }

    /// Median-partitioning depth of top-down rebuilds.
    pub fn tree_topdown_level(&self) -> usize {
        self.tree.topdown_level
    }

    /// Sets the median-partitioning depth of top-down rebuilds.
    pub fn set_tree_topdown_level(&mut self, level: usize) {
        self.tree.topdown_level = level;
    }

    /// The number of objects managed by this manager.
    pub fn size(&self) -> usize {
        self.tree.size()
    }

    /// Whether this manager manages no object.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// The objects managed by this manager, in no particular order.
    pub fn objects(&self) -> Vec<Arc<dyn CollisionObject>> {
        self.objects
            .values()
            .map(|slot| slot.object.clone())
            .collect()
    }

    /// Direct read access to the underlying tree.
    pub fn tree(&self) -> &DynamicTree {
        &self.tree
    }

    /// Removes every object from this manager.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.objects.clear();
        self.table.clear();
        self.free_slots.clear();
    }

    fn alloc_slot(&mut self, slot: ObjectSlot) -> u32 {
        let id = self
            .free_slots
            .pop()
            .unwrap_or(self.objects.len() as u32);
        let _ = self.objects.insert(id as usize, slot);
        id
    }

    /// Registers a batch of objects.
    ///
    /// On an empty manager this bulk-builds the tree in one pass, which
    /// produces a better hierarchy than the same sequence of single
    /// registrations; otherwise it falls back to per-object registration.
    pub fn register_objects(&mut self, objs: &[Arc<dyn CollisionObject>]) {
        if objs.is_empty() {
            return;
        }

        if self.size() > 0 {
            for obj in objs {
                self.register_object(obj.clone());
            }
        } else {
            self.table.reserve(objs.len());
            let mut leaves = Vec::with_capacity(objs.len());
            for obj in objs {
                let slot = self.alloc_slot(ObjectSlot {
                    object: obj.clone(),
                    leaf: 0,
                });
                let _ = self.table.insert(address_of(obj), slot);
                leaves.push((obj.aabb(), slot));
            }

            self.tree.init(leaves, self.tree_init_level);
            self.bind_leaves();
            self.setup_done = true;
        }
    }

    // Rebinds every object slot to its tree leaf after a bulk build.
    fn bind_leaves(&mut self) {
        let Some(root) = self.tree.root() else { return };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.tree.node(id);
            if node.is_leaf() {
                self.objects[node.payload as usize].leaf = id;
            } else {
                stack.push(node.children[0]);
                stack.push(node.children[1]);
            }
        }
    }

    /// Registers one object, binding it to a fresh tree leaf.
    pub fn register_object(&mut self, obj: Arc<dyn CollisionObject>) {
        let aabb = obj.aabb();
        let key = address_of(&obj);
        let slot = self.alloc_slot(ObjectSlot { object: obj, leaf: 0 });
        let leaf = self.tree.insert(aabb, slot);
        self.objects[slot as usize].leaf = leaf;
        let _ = self.table.insert(key, slot);
    }

    /// Unregisters one object, detaching and freeing its leaf.
    ///
    /// Unknown objects are ignored.
    pub fn unregister_object(&mut self, obj: &Arc<dyn CollisionObject>) {
        let Some(slot) = self.table.remove(&address_of(obj)) else {
            return;
        };
        let removed = self.objects.remove(slot as usize).unwrap();
        self.tree.remove(removed.leaf);
        self.free_slots.push(slot);
    }

    /// Balances the tree if anything changed since the last call.
    ///
    /// Mild imbalance is repaired incrementally; past
    /// [`Self::max_tree_nonbalanced_level`] the tree is rebuilt top-down.
    /// This is idempotent until the next mutation.
    pub fn setup(&mut self) {
        if self.setup_done {
            return;
        }

        let num = self.tree.size();
        if num == 0 {
            self.setup_done = true;
            return;
        }

        let height = self.tree.max_height();
        if (height as Real) - (num as Real).log2() < self.max_tree_nonbalanced_level as Real {
            self.tree.balance_incremental(self.tree_incremental_balance_pass);
        } else {
            self.tree.balance_topdown();
        }

        self.setup_done = true;
    }

    /// Re-reads every object's bounding box, refits the tree bottom-up, then
    /// re-runs [`Self::setup`].
    pub fn update(&mut self) {
        for slot in self.objects.values() {
            self.tree.set_leaf_bv(slot.leaf, slot.object.aabb());
        }

        self.tree.refit();
        self.setup_done = false;
        self.setup();
    }

    fn update_no_setup(&mut self, obj: &Arc<dyn CollisionObject>) {
        if let Some(&slot) = self.table.get(&address_of(obj)) {
            let leaf = self.objects[slot as usize].leaf;
            let aabb = obj.aabb();
            let leaf_bv = self.tree.leaf_bv(leaf);
            if !(relative_eq!(leaf_bv.mins, aabb.mins) && relative_eq!(leaf_bv.maxs, aabb.maxs)) {
                let _ = self.tree.update(leaf, aabb);
            }
        }
        self.setup_done = false;
    }

    /// Re-synchronises one object's leaf with its current bounding box, then
    /// re-runs [`Self::setup`]. Unknown objects only mark the manager dirty.
    pub fn update_object(&mut self, obj: &Arc<dyn CollisionObject>) {
        self.update_no_setup(obj);
        self.setup();
    }

    /// Re-synchronises a batch of objects, then re-runs [`Self::setup`] once.
    pub fn update_objects(&mut self, objs: &[Arc<dyn CollisionObject>]) {
        for obj in objs {
            self.update_no_setup(obj);
        }
        self.setup();
    }

    pub(super) fn object(&self, slot: u32) -> &dyn CollisionObject {
        &*self.objects[slot as usize].object
    }

    /// Runs the collision callback on every managed object whose bounding box
    /// overlaps `obj`'s.
    ///
    /// Octree query objects descend into their subdivision when
    /// [`Self::octree_as_geometry_collide`] is disabled.
    pub fn collide_object(&self, obj: &dyn CollisionObject, callback: &mut CollisionCallback) {
        let Some(root) = self.tree.root() else { return };

        if obj.geometry().object_kind() == ObjectKind::Octree && !self.octree_as_geometry_collide {
            if let Some(oct) = obj.geometry().as_octree() {
                let tf = obj.transform();
                let _ = octree::collide_octree(
                    self,
                    root,
                    oct,
                    oct.root(),
                    &oct.root_aabb(),
                    &tf,
                    callback,
                );
                return;
            }
        }

        let aabb = obj.aabb();
        let _ = kernels::collide_object_recurse(self, root, obj, &aabb, callback);
    }

    /// Runs the distance callback over the managed objects, nearest branches
    /// first, pruning with the evolving `min_dist`. Returns the final
    /// `min_dist` value.
    ///
    /// Octree query objects descend into their subdivision when
    /// [`Self::octree_as_geometry_distance`] is disabled.
    pub fn distance_object(&self, obj: &dyn CollisionObject, callback: &mut DistanceCallback) -> Real {
        let mut min_dist = Real::MAX;
        let Some(root) = self.tree.root() else {
            return min_dist;
        };

        if obj.geometry().object_kind() == ObjectKind::Octree && !self.octree_as_geometry_distance {
            if let Some(oct) = obj.geometry().as_octree() {
                if let Some(oct_root) = oct.root() {
                    let tf = obj.transform();
                    let _ = octree::distance_octree_recurse(
                        self,
                        root,
                        oct,
                        oct_root,
                        &oct.root_aabb(),
                        &tf,
                        callback,
                        &mut min_dist,
                    );
                }
                return min_dist;
            }
        }

        let aabb = obj.aabb();
        let _ = kernels::distance_object_recurse(self, root, obj, &aabb, callback, &mut min_dist);
        min_dist
    }

    /// Runs the collision callback on every overlapping pair of managed
    /// objects. Each unordered pair is visited at most once.
    pub fn self_collide(&self, callback: &mut CollisionCallback) {
        let Some(root) = self.tree.root() else { return };
        let _ = kernels::self_collide_recurse(self, root, callback);
    }

    /// Runs the distance callback over every candidate pair of managed
    /// objects, pruning with the evolving `min_dist`. Returns the final
    /// `min_dist` value.
    pub fn self_distance(&self, callback: &mut DistanceCallback) -> Real {
        let mut min_dist = Real::MAX;
        let Some(root) = self.tree.root() else {
            return min_dist;
        };
        let _ = kernels::self_distance_recurse(self, root, callback, &mut min_dist);
        min_dist
    }

    /// Runs the collision callback on every overlapping pair across two
    /// managers.
    pub fn collide_manager(
        &self,
        other: &DynamicAabbTreeCollisionManager,
        callback: &mut CollisionCallback,
    ) {
        let (Some(root1), Some(root2)) = (self.tree.root(), other.tree.root()) else {
            return;
        };
        let _ = kernels::collide_pair_recurse(self, root1, other, root2, callback);
    }

    /// Runs the distance callback over candidate pairs across two managers,
    /// pruning with the evolving `min_dist`. Returns the final `min_dist`
    /// value.
    pub fn distance_manager(
        &self,
        other: &DynamicAabbTreeCollisionManager,
        callback: &mut DistanceCallback,
    ) -> Real {
        let mut min_dist = Real::MAX;
        let (Some(root1), Some(root2)) = (self.tree.root(), other.tree.root()) else {
            return min_dist;
        };
        let _ =
            kernels::distance_pair_recurse(self, root1, other, root2, callback, &mut min_dist);
        min_dist
    }
}
