use crate::bounding_volume::{Aabb, BoundingVolume};

/// Sentinel index marking the absence of a node.
pub(crate) const NULL_NODE: u32 = u32::MAX;

/// A node of the dynamic AABB tree.
///
/// An internal node owns exactly two children; a leaf owns no children and
/// carries a `payload` handle pointing at an external object. The `parent`
/// index is a back-reference, not ownership: the tree's arena owns every node.
#[derive(Copy, Clone, Debug)]
pub(crate) struct TreeNode {
    /// The bounding volume of this node. For internal nodes this always
    /// contains the bounding volumes of both children.
    pub bv: Aabb,
    /// Index of the parent node, or `NULL_NODE` for the root.
    pub parent: u32,
    /// Indices of the two children. `[NULL_NODE; 2]` identifies a leaf.
    pub children: [u32; 2],
    /// External object handle. Only meaningful on leaves.
    pub payload: u32,
}

impl TreeNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children[0] == NULL_NODE
    }
}

/// A self-balancing dynamic AABB tree.
///
/// Nodes live in an arena indexed by `u32`; removed slots are recycled
/// through a free list. The tree supports incremental insertion and removal,
/// leaf updates, bottom-up refitting, rotation-based incremental balancing
/// and top-down rebuilds.
pub struct DynamicTree {
    pub(super) nodes: Vec<TreeNode>,
    pub(super) free: Vec<u32>,
    pub(super) root: u32,
    pub(super) n_leaves: usize,
    /// Rotating entry-point used by the incremental balancing pass.
    pub(super) opath: u32,
    /// Leaf-count under which a top-down rebuild falls back to incremental
    /// balancing.
    pub topdown_balance_threshold: usize,
    /// Depth of recursive median partitioning applied by a top-down rebuild
    /// before the remaining subsets are built by incremental insertion.
    /// 0 leaves the depth unbounded.
    pub topdown_level: usize,
}

impl Default for DynamicTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicTree {
    /// An empty dynamic AABB tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NULL_NODE,
            n_leaves: 0,
            opath: 0,
            topdown_balance_threshold: 2,
            topdown_level: 0,
        }
    }

    /// The number of leaves of this tree.
    #[inline]
    pub fn size(&self) -> usize {
        self.n_leaves
    }

    /// Does this tree contain no leaf?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_leaves == 0
    }

    /// The index of the root node, if the tree is non-empty.
    #[inline]
    pub fn root(&self) -> Option<u32> {
        (self.root != NULL_NODE).then_some(self.root)
    }

    /// The bounding volume currently stored on the given leaf.
    #[inline]
    pub fn leaf_bv(&self, leaf: u32) -> &Aabb {
        &self.nodes[leaf as usize].bv
    }

    /// The payload handle carried by the given leaf.
    #[inline]
    pub fn leaf_payload(&self, leaf: u32) -> u32 {
        debug_assert!(self.node(leaf).is_leaf());
        self.nodes[leaf as usize].payload
    }

    /// Removes every node from this tree.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = NULL_NODE;
        self.n_leaves = 0;
    }

    /// The height of this tree: the number of edges on the longest
    /// root-to-leaf path. An empty or single-leaf tree has height 0.
    pub fn max_height(&self) -> usize {
        if self.root == NULL_NODE {
            0
        } else {
            self.height_recurse(self.root)
        }
    }

    fn height_recurse(&self, id: u32) -> usize {
        let node = self.node(id);
        if node.is_leaf() {
            0
        } else {
            self.height_recurse(node.children[0])
                .max(self.height_recurse(node.children[1]))
                + 1
        }
    }

    /// Creates a leaf carrying `payload` and attaches it where the descent
    /// cost heuristic is minimised.
    ///
    /// Returns the index of the new leaf. The index stays valid until the
    /// leaf is removed, across balancing and rebuilds.
    pub fn insert(&mut self, bv: Aabb, payload: u32) -> u32 {
        let leaf = self.alloc_leaf(bv, payload);
        self.root = self.insert_leaf_under(self.root, leaf);
        self.n_leaves += 1;
        leaf
    }

    /// Detaches and frees the given leaf.
    pub fn remove(&mut self, leaf: u32) {
        assert!(self.node(leaf).is_leaf(), "remove expects a leaf node");
        self.remove_leaf(leaf);
        self.free_node(leaf);
        self.n_leaves -= 1;
    }

    /// Moves the given leaf so that it covers `bv`.
    ///
    /// If the leaf's current bounding volume already encloses `bv` this is a
    /// conservative no-op and `false` is returned. Otherwise the leaf is
    /// detached and re-inserted with the new bounding volume.
    pub fn update(&mut self, leaf: u32, bv: Aabb) -> bool {
        debug_assert!(self.node(leaf).is_leaf());

        if self.node(leaf).bv.contains(&bv) {
            return false;
        }

        self.remove_leaf(leaf);
        self.nodes[leaf as usize].bv = bv;
        self.root = self.insert_leaf_under(self.root, leaf);
        true
    }

    /// Overwrites the bounding volume stored on a leaf without touching its
    /// ancestors.
    ///
    /// The tree is left in a state where internal nodes may no longer enclose
    /// their children; call [`Self::refit`] once every leaf has been
    /// rewritten.
    pub fn set_leaf_bv(&mut self, leaf: u32, bv: Aabb) {
        debug_assert!(self.node(leaf).is_leaf());
        self.nodes[leaf as usize].bv = bv;
    }

    /// Recomputes every internal node's bounding volume, bottom-up, as the
    /// merge of its children.
    pub fn refit(&mut self) {
        if self.root != NULL_NODE && !self.node(self.root).is_leaf() {
            let _ = self.refit_recurse(self.root);
        }
    }

    fn refit_recurse(&mut self, id: u32) -> Aabb {
        let node = *self.node(id);
        if node.is_leaf() {
            return node.bv;
        }

        let left = self.refit_recurse(node.children[0]);
        let right = self.refit_recurse(node.children[1]);
        let merged = left.merged(&right);
        self.nodes[id as usize].bv = merged;
        merged
    }

    /*
     * Internals shared with the balancing code.
     */

    #[inline]
    pub(crate) fn node(&self, id: u32) -> &TreeNode {
        &self.nodes[id as usize]
    }

    pub(super) fn alloc_leaf(&mut self, bv: Aabb, payload: u32) -> u32 {
        self.alloc(TreeNode {
            bv,
            parent: NULL_NODE,
            children: [NULL_NODE; 2],
            payload,
        })
    }

    pub(super) fn alloc_internal(&mut self, bv: Aabb, children: [u32; 2]) -> u32 {
        let id = self.alloc(TreeNode {
            bv,
            parent: NULL_NODE,
            children,
            payload: 0,
        });
        self.nodes[children[0] as usize].parent = id;
        self.nodes[children[1] as usize].parent = id;
        id
    }

    fn alloc(&mut self, node: TreeNode) -> u32 {
        if let Some(id) = self.free.pop() {
            self.nodes[id as usize] = node;
            id
        } else {
            let id = self.nodes.len() as u32;
            self.nodes.push(node);
            id
        }
    }

    pub(super) fn free_node(&mut self, id: u32) {
        self.free.push(id);
    }

    /// Attaches `leaf` somewhere below `sub_root` and returns the (possibly
    /// new) root of that subtree.
    ///
    /// Ancestor bounding volumes above the attachment point are enlarged, up
    /// to and including `sub_root`; nothing above `sub_root` is touched.
    pub(super) fn insert_leaf_under(&mut self, sub_root: u32, leaf: u32) -> u32 {
        if sub_root == NULL_NODE {
            self.nodes[leaf as usize].parent = NULL_NODE;
            return leaf;
        }

        let leaf_bv = self.node(leaf).bv;

        // Descend towards the child whose enlargement cost is smallest,
        // breaking ties on the left.
        let mut target = sub_root;
        while !self.node(target).is_leaf() {
            let [c0, c1] = self.node(target).children;
            let bv0 = &self.node(c0).bv;
            let bv1 = &self.node(c1).bv;
            let cost0 = bv0.merged(&leaf_bv).volume() - bv0.volume();
            let cost1 = bv1.merged(&leaf_bv).volume() - bv1.volume();
            target = if cost0 <= cost1 { c0 } else { c1 };
        }

        // A new internal node takes the slot of the leaf we arrived at, with
        // that leaf and the inserted one as its children.
        let old_parent = self.node(target).parent;
        let merged = self.node(target).bv.merged(&leaf_bv);
        let new_parent = self.alloc_internal(merged, [target, leaf]);
        self.nodes[new_parent as usize].parent = old_parent;

        if old_parent == NULL_NODE {
            return new_parent;
        }

        let parent = &mut self.nodes[old_parent as usize];
        if parent.children[0] == target {
            parent.children[0] = new_parent;
        } else {
            parent.children[1] = new_parent;
        }

        // Enlarge the ancestors until one already contains the inserted box.
        let mut curr = old_parent;
        loop {
            let node = &mut self.nodes[curr as usize];
            if node.bv.contains(&leaf_bv) {
                break;
            }
            node.bv.merge(&leaf_bv);
            if node.parent == NULL_NODE {
                break;
            }
            curr = self.nodes[curr as usize].parent;
        }

        sub_root
    }

    /// Detaches `leaf` from the tree without freeing its node.
    ///
    /// The leaf's former parent is freed; its sibling takes the parent's slot.
    pub(super) fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.node(leaf).parent;
        let [c0, c1] = self.node(parent).children;
        let sibling = if c0 == leaf { c1 } else { c0 };
        let grand = self.node(parent).parent;

        self.free_node(parent);

        if grand == NULL_NODE {
            self.nodes[sibling as usize].parent = NULL_NODE;
            self.root = sibling;
            return;
        }

        let grand_node = &mut self.nodes[grand as usize];
        if grand_node.children[0] == parent {
            grand_node.children[0] = sibling;
        } else {
            grand_node.children[1] = sibling;
        }
        self.nodes[sibling as usize].parent = grand;

        // Tighten the ancestors until one is left unchanged by the re-merge.
        let mut curr = grand;
        while curr != NULL_NODE {
            let [a, b] = self.node(curr).children;
            let merged = self.node(a).bv.merged(&self.node(b).bv);
            if self.node(curr).bv == merged {
                break;
            }
            self.nodes[curr as usize].bv = merged;
            curr = self.node(curr).parent;
        }
    }
}

/// Chooses which of two sibling bounding volumes a query descends first.
///
/// Returns the index of the child whose bounding volume merged with
/// `query` has the smaller enlargement; ties go to the child whose current
/// bounding volume is smaller, and `0` in the last resort.
#[inline]
pub(crate) fn select(query: &Aabb, bv0: &Aabb, bv1: &Aabb) -> usize {
    let enlarge0 = bv0.merged(query).volume() - bv0.volume();
    let enlarge1 = bv1.merged(query).volume() - bv1.volume();

    if enlarge0 < enlarge1 {
        0
    } else if enlarge1 < enlarge0 {
        1
    } else if bv0.volume() <= bv1.volume() {
        0
    } else {
        1
    }
}
