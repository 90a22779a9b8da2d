use super::tree::{DynamicTree, NULL_NODE};
use crate::bounding_volume::BoundingVolume;

impl DynamicTree {
    /// Panics if any structural invariant of this tree is broken.
    ///
    /// Checks, for the whole tree: parent back-references, the two-children
    /// rule for internal nodes, bounding-volume containment, the leaf count,
    /// and the consistency of the free list with the arena.
    pub fn assert_well_formed(&self) {
        if self.root == NULL_NODE {
            assert_eq!(self.n_leaves, 0);
            assert_eq!(
                self.free.len(),
                self.nodes.len(),
                "an empty tree must have every arena slot on the free list"
            );
            return;
        }

        assert_eq!(self.node(self.root).parent, NULL_NODE);

        let mut leaf_count = 0;
        let mut node_count = 0;
        self.assert_well_formed_recurse(self.root, &mut leaf_count, &mut node_count);

        assert_eq!(leaf_count, self.n_leaves, "leaf count out of sync");
        assert_eq!(
            node_count + self.free.len(),
            self.nodes.len(),
            "arena slots must be either reachable or free"
        );
    }

    fn assert_well_formed_recurse(&self, id: u32, leaf_count: &mut usize, node_count: &mut usize) {
        *node_count += 1;
        let node = self.node(id);

        if node.is_leaf() {
            assert_eq!(node.children[1], NULL_NODE, "a leaf owns no children");
            *leaf_count += 1;
            return;
        }

        for child in node.children {
            assert_ne!(child, NULL_NODE, "an internal node owns two children");
            assert_eq!(self.node(child).parent, id, "broken parent back-reference");
            assert!(
                node.bv.contains(&self.node(child).bv),
                "an internal node must contain its children"
            );
            self.assert_well_formed_recurse(child, leaf_count, node_count);
        }
    }
}
