use super::tree::{DynamicTree, NULL_NODE};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::DIM;

/// Pass count used when a top-down rebuild falls back to incremental
/// balancing on a small tree.
const FALLBACK_INCREMENTAL_PASSES: usize = 10;

impl DynamicTree {
    /// Runs a bounded number of incremental balancing passes.
    ///
    /// Each pass walks from the root towards a leaf, steered by a rotating
    /// entry-point so that successive passes visit different branches, and
    /// applies at every node on the path the best volume-reducing rotation
    /// among the four grandchild/uncle swaps, if any reduces the volume.
    pub fn balance_incremental(&mut self, passes: usize) {
        if self.root == NULL_NODE || self.node(self.root).is_leaf() {
            return;
        }

        for _ in 0..passes {
            let mut id = self.root;
            let mut bit = 0;

            while !self.node(id).is_leaf() {
                self.try_rotate(id);
                let side = ((self.opath >> bit) & 1) as usize;
                id = self.node(id).children[side];
                bit = (bit + 1) & 31;
            }

            self.opath = self.opath.wrapping_add(1);
        }
    }

    // Applies the best volume-reducing rotation at `id`, if there is one.
    //
    // A rotation swaps one child of `id` (the uncle) with one grandchild on
    // the other side. The bounding volume of `id` itself is unchanged by the
    // swap; what shrinks is the internal node that lost a grandchild.
    fn try_rotate(&mut self, id: u32) {
        let children = self.node(id).children;
        let mut best_gain = 0.0;
        let mut best: Option<(usize, usize)> = None;

        for uncle_side in 0..2 {
            let uncle = children[uncle_side];
            let other = children[1 - uncle_side];
            if self.node(other).is_leaf() {
                continue;
            }

            let other_volume = self.node(other).bv.volume();
            let grandchildren = self.node(other).children;

            for grandchild_side in 0..2 {
                let kept = grandchildren[1 - grandchild_side];
                let new_volume = self
                    .node(uncle)
                    .bv
                    .merged(&self.node(kept).bv)
                    .volume();
                let gain = new_volume - other_volume;
                if gain < best_gain {
                    best_gain = gain;
                    best = Some((uncle_side, grandchild_side));
                }
            }
        }

        if let Some((uncle_side, grandchild_side)) = best {
            let uncle = children[uncle_side];
            let other = children[1 - uncle_side];
            let grandchild = self.node(other).children[grandchild_side];

            self.nodes[id as usize].children[uncle_side] = grandchild;
            self.nodes[grandchild as usize].parent = id;
            self.nodes[other as usize].children[grandchild_side] = uncle;
            self.nodes[uncle as usize].parent = other;

            let [a, b] = self.node(other).children;
            let merged = self.node(a).bv.merged(&self.node(b).bv);
            self.nodes[other as usize].bv = merged;
        }
    }

    /// Rebuilds the whole tree top-down.
    ///
    /// Small trees (at most [`Self::topdown_balance_threshold`] leaves) fall
    /// through to incremental balancing. Otherwise every leaf is collected and
    /// the tree is rebuilt by recursive median partitioning along the longest
    /// axis, down to [`Self::topdown_level`] levels (unbounded when 0), below
    /// which subsets are rebuilt by incremental insertion. Leaf nodes are
    /// reused; only internal nodes are reallocated.
    pub fn balance_topdown(&mut self) {
        if self.n_leaves <= self.topdown_balance_threshold {
            self.balance_incremental(FALLBACK_INCREMENTAL_PASSES);
            return;
        }

        let max_level = self.topdown_level;
        let mut leaves = Vec::with_capacity(self.n_leaves);
        self.collect_leaves(self.root, &mut leaves);
        self.free_internal(self.root);

        self.root = self.build_subtree(&mut leaves, 0, max_level);
        if self.root != NULL_NODE {
            self.nodes[self.root as usize].parent = NULL_NODE;
        }
    }

    /// Bulk construction from a set of leaves.
    ///
    /// This clears the tree, then builds it the way [`Self::balance_topdown`]
    /// would, with `level` as the median-partitioning depth (unbounded when
    /// 0). Payloads follow the iteration order of `leaves`.
    pub fn init<It>(&mut self, leaves: It, level: usize)
    where
        It: IntoIterator<Item = (Aabb, u32)>,
    {
        self.clear();

        let mut leaf_ids = Vec::new();
        for (bv, payload) in leaves {
            leaf_ids.push(self.alloc_leaf(bv, payload));
        }
        self.n_leaves = leaf_ids.len();

        self.root = self.build_subtree(&mut leaf_ids, 0, level);
        if self.root != NULL_NODE {
            self.nodes[self.root as usize].parent = NULL_NODE;
        }
    }

    fn collect_leaves(&self, id: u32, out: &mut Vec<u32>) {
        if id == NULL_NODE {
            return;
        }
        let node = self.node(id);
        if node.is_leaf() {
            out.push(id);
        } else {
            self.collect_leaves(node.children[0], out);
            self.collect_leaves(node.children[1], out);
        }
    }

    fn free_internal(&mut self, id: u32) {
        if id == NULL_NODE {
            return;
        }
        let node = *self.node(id);
        if !node.is_leaf() {
            self.free_internal(node.children[0]);
            self.free_internal(node.children[1]);
            self.free_node(id);
        }
    }

    // Builds a subtree over the given leaves and returns its root.
    //
    // While the recursion depth budget and the subset size allow it, the
    // leaves are sorted along the longest axis of their combined bounding box
    // and split at the median centroid. Exhausted budgets fall back to
    // incremental insertion. A `max_level` of 0 leaves the depth unbounded:
    // partitioning then runs all the way down to the size threshold.
    fn build_subtree(&mut self, leaves: &mut [u32], level: usize, max_level: usize) -> u32 {
        match leaves.len() {
            0 => return NULL_NODE,
            1 => {
                let leaf = leaves[0];
                self.nodes[leaf as usize].parent = NULL_NODE;
                return leaf;
            }
            _ => {}
        }

        if (max_level == 0 || level < max_level) && leaves.len() > self.topdown_balance_threshold {
            let mut bound = Aabb::new_invalid();
            for leaf in leaves.iter() {
                bound.merge(&self.node(*leaf).bv);
            }

            let extents = bound.extents();
            let mut axis = 0;
            for i in 1..DIM {
                if extents[i] > extents[axis] {
                    axis = i;
                }
            }

            leaves.sort_unstable_by(|a, b| {
                let ca = self.node(*a).bv.center()[axis];
                let cb = self.node(*b).bv.center()[axis];
                ca.partial_cmp(&cb).unwrap_or(core::cmp::Ordering::Equal)
            });

            let mid = leaves.len() / 2;
            let mut lo = leaves[..mid].to_vec();
            let mut hi = leaves[mid..].to_vec();
            let left = self.build_subtree(&mut lo, level + 1, max_level);
            let right = self.build_subtree(&mut hi, level + 1, max_level);

            let merged = self.node(left).bv.merged(&self.node(right).bv);
            self.alloc_internal(merged, [left, right])
        } else {
            let mut sub_root = leaves[0];
            self.nodes[sub_root as usize].parent = NULL_NODE;
            for leaf in &leaves[1..] {
                self.nodes[*leaf as usize].parent = NULL_NODE;
                sub_root = self.insert_leaf_under(sub_root, *leaf);
            }
            sub_root
        }
    }
}
