use crate::bounding_volume::Aabb;
use crate::math::{Isometry, Point, Real};

/// The coarse family a collision geometry belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A geometric primitive (box, sphere, …).
    Geometric,
    /// A bounding-volume-hierarchy model (typically a triangle mesh).
    Bvh,
    /// An octree occupancy map.
    Octree,
}

/// The bounding-volume flavor carried by the nodes of a mesh model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BvKind {
    /// Axis-aligned bounding boxes.
    Aabb,
    /// Oriented bounding boxes.
    Obb,
    /// Rectangle swept spheres.
    Rss,
    /// Intersection-of-spheres volumes.
    Kios,
    /// Combined OBB + RSS volumes.
    ObbRss,
    /// Discrete-orientation polytopes with 16 half-spaces.
    Kdop16,
    /// Discrete-orientation polytopes with 18 half-spaces.
    Kdop18,
    /// Discrete-orientation polytopes with 24 half-spaces.
    Kdop24,
}

/// The concrete kind of a collision geometry.
///
/// Narrow-phase collaborators key their dispatch tables on pairs of these.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// A box primitive.
    Box,
    /// A sphere primitive.
    Sphere,
    /// A capsule primitive.
    Capsule,
    /// A cone primitive.
    Cone,
    /// A cylinder primitive.
    Cylinder,
    /// A convex polytope.
    Convex,
    /// A half-space.
    Halfspace,
    /// A plane.
    Plane,
    /// A single triangle.
    Triangle,
    /// An octree occupancy map.
    Octree,
    /// A mesh model whose hierarchy uses the given bounding-volume kind.
    Mesh(BvKind),
}

/// A geometry usable by the broad-phase managers and the continuous-collision
/// dispatcher.
///
/// Concrete shapes, their intersection kernels, and mesh hierarchies live in
/// collaborating crates; this crate only relies on the classification and
/// down-casting surface below.
pub trait CollisionGeometry {
    /// The coarse family of this geometry.
    fn object_kind(&self) -> ObjectKind;

    /// The concrete kind of this geometry.
    fn shape_kind(&self) -> ShapeKind;

    /// The axis-aligned bounding box of this geometry in its local frame.
    fn local_aabb(&self) -> Aabb;

    /// The collision cost density of this geometry.
    fn cost_density(&self) -> Real {
        1.0
    }

    /// The occupancy threshold above which this geometry counts as occupied.
    fn threshold_occupied(&self) -> Real {
        1.0
    }

    /// This geometry seen as an octree, if it is one.
    fn as_octree(&self) -> Option<&dyn OctreeGeometry> {
        None
    }

    /// This geometry seen as a mesh model, if it is one.
    fn as_mesh(&self) -> Option<&dyn MeshModel> {
        None
    }

    /// Mutable access to this geometry seen as a mesh model, if it is one.
    fn as_mesh_mut(&mut self) -> Option<&mut dyn MeshModel> {
        None
    }
}

/// A positioned collision object managed by a broad-phase manager.
///
/// The manager never owns the object: it is shared between the manager and
/// the caller, and the caller remains responsible for its lifetime.
pub trait CollisionObject {
    /// The world-space axis-aligned bounding box of this object.
    fn aabb(&self) -> Aabb;

    /// The world-space transform of this object.
    fn transform(&self) -> Isometry<Real>;

    /// The geometry carried by this object.
    fn geometry(&self) -> &dyn CollisionGeometry;

    /// Whether this object stands for free space in a cost map.
    ///
    /// Free objects are skipped by the octree collision kernels.
    fn is_free(&self) -> bool {
        false
    }
}

/// An opaque handle identifying one node of an octree collaborator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OctreeNodeRef(pub usize);

/// An octree occupancy map.
///
/// Octree nodes do not carry their own bounding volumes: traversals derive
/// each child volume by halving the parent volume, starting from
/// [`Self::root_aabb`]. Absent children stand for space at the tree's default
/// occupancy.
pub trait OctreeGeometry {
    /// The root node, or `None` for an empty octree.
    fn root(&self) -> Option<OctreeNodeRef>;

    /// The axis-aligned bounding box of the whole octree, in its local frame.
    fn root_aabb(&self) -> Aabb;

    /// Whether the given node has at least one child.
    fn node_has_children(&self, node: OctreeNodeRef) -> bool;

    /// Whether child `i` (in `0..8`) of the given node exists.
    fn node_child_exists(&self, node: OctreeNodeRef, i: usize) -> bool;

    /// Child `i` (in `0..8`) of the given node. Only valid if
    /// [`Self::node_child_exists`] returned `true`.
    fn node_child(&self, node: OctreeNodeRef, i: usize) -> OctreeNodeRef;

    /// Whether the given node is known to be free space.
    fn is_node_free(&self, node: OctreeNodeRef) -> bool;

    /// Whether the given node is known to be occupied.
    fn is_node_occupied(&self, node: OctreeNodeRef) -> bool;

    /// The occupancy probability stored on the given node.
    fn node_occupancy(&self, node: OctreeNodeRef) -> Real;

    /// The occupancy probability above which a node counts as occupied.
    fn occupancy_threshold(&self) -> Real;

    /// The occupancy probability assumed for absent children.
    fn default_occupancy(&self) -> Real;

    /// Whether absent children count as free space.
    fn is_default_free(&self) -> bool {
        self.default_occupancy() < self.occupancy_threshold()
    }
}

/// A mesh model whose vertex buffer can be rewritten in place.
///
/// This is the surface the polynomial continuous-collision path relies on:
/// vertices are displaced, then the owning hierarchy is refreshed through the
/// `begin_update` / `update_vertices` / `end_update` cycle.
pub trait MeshModel {
    /// The number of vertices of this mesh.
    fn vertex_count(&self) -> usize;

    /// The current vertex buffer of this mesh.
    fn vertices(&self) -> &[Point<Real>];

    /// Starts a model-update cycle.
    fn begin_update(&mut self);

    /// Replaces the vertex buffer with the given one.
    fn update_vertices(&mut self, vertices: &[Point<Real>]);

    /// Ends the model-update cycle, refreshing the mesh hierarchy.
    fn end_update(&mut self);
}
