use crate::geometry::{CollisionGeometry, MeshModel, ObjectKind, ShapeKind};
use crate::math::{Isometry, Real};
use crate::motion::{motion_from_transforms, Motion, MotionKind, TranslationMotion};
use crate::utils::hashmap::HashMap;

/// The GJK-family solver flavor a narrow-phase collaborator was built
/// around.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GjkSolverKind {
    /// A libccd-style solver.
    LibCcd,
    /// An independent GJK/EPA implementation.
    Indep,
}

/// The algorithm used to estimate a time of contact.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CcdSolverKind {
    /// Discrete collision checks at regularly sampled times.
    Naive,
    /// Conservative advancement through per-shape-pair kernels.
    ConservativeAdvancement,
    /// Ray-shooting. Reserved; currently unimplemented.
    RayShooting,
    /// Polynomial root finding on translating meshes.
    PolynomialSolver,
}

/// Parameters of a continuous-collision query.
#[derive(Copy, Clone, Debug)]
pub struct ContinuousCollisionRequest {
    /// The motion family both objects follow.
    pub ccd_motion_type: MotionKind,
    /// The GJK solver flavor used by conservative advancement.
    pub gjk_solver_type: GjkSolverKind,
    /// The time-of-contact algorithm to run.
    pub ccd_solver_type: CcdSolverKind,
    /// Upper bound on the number of iterations (or samples).
    pub num_max_iterations: usize,
    /// Tolerance on the reported time of contact.
    pub toc_err: Real,
}

impl Default for ContinuousCollisionRequest {
    fn default() -> Self {
        Self {
            ccd_motion_type: MotionKind::Translation,
            gjk_solver_type: GjkSolverKind::LibCcd,
            ccd_solver_type: CcdSolverKind::Naive,
            num_max_iterations: 10,
            toc_err: 1.0e-4,
        }
    }
}

/// Outcome of a continuous-collision query.
#[derive(Clone, Debug)]
pub struct ContinuousCollisionResult {
    /// Whether the two objects touch at some time in `[0, 1]`.
    pub is_collide: bool,
    /// The earliest estimated contact time, or `1.0` on a miss.
    pub time_of_contact: Real,
    /// The transform of the first object at the contact time.
    pub contact_tf1: Isometry<Real>,
    /// The transform of the second object at the contact time.
    pub contact_tf2: Isometry<Real>,
}

impl Default for ContinuousCollisionResult {
    fn default() -> Self {
        Self {
            is_collide: false,
            time_of_contact: 1.0,
            contact_tf1: Isometry::identity(),
            contact_tf2: Isometry::identity(),
        }
    }
}

/// One conservative-advancement kernel, specialised for a pair of shape
/// kinds.
pub type ConservativeAdvancementFn = fn(
    &dyn CollisionGeometry,
    &dyn Motion,
    &dyn CollisionGeometry,
    &dyn Motion,
    &ContinuousCollisionRequest,
    &mut ContinuousCollisionResult,
) -> Real;

/// A table of conservative-advancement kernels keyed by shape-kind pairs.
///
/// Absent entries are the unsupported case.
#[derive(Default)]
pub struct ConservativeAdvancementMatrix {
    table: HashMap<(ShapeKind, ShapeKind), ConservativeAdvancementFn>,
}

impl ConservativeAdvancementMatrix {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the kernel handling the given pair of shape kinds.
    pub fn register(&mut self, kind1: ShapeKind, kind2: ShapeKind, f: ConservativeAdvancementFn) {
        let _ = self.table.insert((kind1, kind2), f);
    }

    /// The kernel handling the given pair of shape kinds, if any.
    pub fn lookup(&self, kind1: ShapeKind, kind2: ShapeKind) -> Option<ConservativeAdvancementFn> {
        self.table.get(&(kind1, kind2)).copied()
    }
}

/// Result of one continuous mesh traversal run by a narrow-phase
/// collaborator.
#[derive(Copy, Clone, Debug)]
pub struct MeshCcdHit {
    /// Number of triangle pairs found in contact.
    pub contact_count: usize,
    /// The earliest contact time over all pairs.
    pub time_of_contact: Real,
}

/// The narrow-phase surface consumed by the continuous-collision dispatcher.
pub trait NarrowPhaseBackend {
    /// Discrete intersection test between two geometries at fixed
    /// transforms.
    fn intersects(
        &self,
        g1: &dyn CollisionGeometry,
        tf1: &Isometry<Real>,
        g2: &dyn CollisionGeometry,
        tf2: &Isometry<Real>,
    ) -> bool;

    /// The conservative-advancement table built for the given solver flavor,
    /// if this backend carries one.
    fn conservative_advancement(
        &self,
        solver: GjkSolverKind,
    ) -> Option<&ConservativeAdvancementMatrix> {
        let _ = solver;
        None
    }

    /// Runs a continuous traversal between two mesh models whose vertex
    /// buffers hold the `t = 1` positions while their transforms hold the
    /// `t = 0` poses. Returns `None` when this backend cannot traverse the
    /// meshes' bounding-volume kind.
    fn mesh_continuous_collide(
        &self,
        m1: &dyn MeshModel,
        tf1: &Isometry<Real>,
        m2: &dyn MeshModel,
        tf2: &Isometry<Real>,
    ) -> Option<MeshCcdHit> {
        let _ = (m1, tf1, m2, tf2);
        None
    }
}

/// Estimates a time of contact by sampling discrete times.
///
/// Runs `min(num_max_iterations, ceil(1 / toc_err))` discrete collision
/// checks at evenly spaced times and reports the first hit.
pub fn continuous_collide_naive(
    o1: &dyn CollisionGeometry,
    motion1: &dyn Motion,
    o2: &dyn CollisionGeometry,
    motion2: &dyn Motion,
    backend: &dyn NarrowPhaseBackend,
    request: &ContinuousCollisionRequest,
    result: &mut ContinuousCollisionResult,
) -> Real {
    let samples = (1.0 / request.toc_err).ceil() as usize;
    let n_iter = request.num_max_iterations.min(samples).max(2);

    for i in 0..n_iter {
        let t = i as Real / (n_iter - 1) as Real;
        let tf1 = motion1.transform_at(t);
        let tf2 = motion2.transform_at(t);

        if backend.intersects(o1, &tf1, o2, &tf2) {
            result.is_collide = true;
            result.time_of_contact = t;
            result.contact_tf1 = tf1;
            result.contact_tf2 = tf2;
            return t;
        }
    }

    result.is_collide = false;
    result.time_of_contact = 1.0;
    result.time_of_contact
}

/// Estimates a time of contact by conservative advancement.
///
/// The per-shape-pair kernel comes from the backend's dispatch table for the
/// requested solver flavor; missing tables or entries report `-1.0` with
/// `is_collide` left `false`.
pub fn continuous_collide_conservative_advancement(
    o1: &dyn CollisionGeometry,
    motion1: &dyn Motion,
    o2: &dyn CollisionGeometry,
    motion2: &dyn Motion,
    backend: &dyn NarrowPhaseBackend,
    request: &ContinuousCollisionRequest,
    result: &mut ContinuousCollisionResult,
) -> Real {
    let Some(table) = backend.conservative_advancement(request.gjk_solver_type) else {
        return -1.0;
    };

    let mut res = -1.0;

    match table.lookup(o1.shape_kind(), o2.shape_kind()) {
        None => log::warn!(
            "conservative advancement between {:?} and {:?} is not supported",
            o1.shape_kind(),
            o2.shape_kind()
        ),
        Some(advance) => {
            res = advance(o1, motion1, o2, motion2, request, result);
        }
    }

    if result.is_collide {
        let toc = result.time_of_contact;
        result.contact_tf1 = motion1.transform_at(toc);
        result.contact_tf2 = motion2.transform_at(toc);
    }

    res
}

// Polynomial-solver path for a pair of translating meshes.
//
// Vertex buffers are advanced to their end-of-interval positions, the models
// are refreshed, and the continuous traversal is run by the backend over the
// start-of-interval transforms.
fn continuous_collide_bvh_polynomial(
    o1: &mut dyn CollisionGeometry,
    motion1: &TranslationMotion,
    o2: &mut dyn CollisionGeometry,
    motion2: &TranslationMotion,
    backend: &dyn NarrowPhaseBackend,
    result: &mut ContinuousCollisionResult,
) -> Real {
    match (o1.shape_kind(), o2.shape_kind()) {
        (ShapeKind::Mesh(bv1), ShapeKind::Mesh(bv2)) if bv1 == bv2 => {}
        _ => {
            log::warn!("bounding-volume kind not supported by the polynomial CCD solver");
            return -1.0;
        }
    }

    let velocity1 = motion1.velocity();
    let velocity2 = motion2.velocity();

    {
        let Some(mesh1) = o1.as_mesh_mut() else {
            log::warn!("the polynomial CCD solver requires mesh models");
            return -1.0;
        };
        let displaced: Vec<_> = mesh1.vertices().iter().map(|v| *v + velocity1).collect();
        mesh1.begin_update();
        mesh1.update_vertices(&displaced);
        mesh1.end_update();
    }
    {
        let Some(mesh2) = o2.as_mesh_mut() else {
            log::warn!("the polynomial CCD solver requires mesh models");
            return -1.0;
        };
        let displaced: Vec<_> = mesh2.vertices().iter().map(|v| *v + velocity2).collect();
        mesh2.begin_update();
        mesh2.update_vertices(&displaced);
        mesh2.end_update();
    }

    let tf1 = motion1.transform_at(0.0);
    let tf2 = motion2.transform_at(0.0);

    let (Some(mesh1), Some(mesh2)) = (o1.as_mesh(), o2.as_mesh()) else {
        return -1.0;
    };
    let Some(hit) = backend.mesh_continuous_collide(mesh1, &tf1, mesh2, &tf2) else {
        return -1.0;
    };

    result.is_collide = hit.contact_count > 0;
    result.time_of_contact = hit.time_of_contact;

    if result.is_collide {
        result.contact_tf1 = motion1.transform_at(hit.time_of_contact);
        result.contact_tf2 = motion2.transform_at(hit.time_of_contact);
    }

    result.time_of_contact
}

/// Continuous collision check between two moving geometries.
///
/// Dispatches on the requested solver, the geometry families, and the motion
/// family. Unsupported combinations emit a warning and report `-1.0` with
/// `result.is_collide` left `false`.
///
/// The geometries are taken mutably because the polynomial solver advances
/// mesh vertex buffers in place.
pub fn continuous_collide(
    o1: &mut dyn CollisionGeometry,
    motion1: &dyn Motion,
    o2: &mut dyn CollisionGeometry,
    motion2: &dyn Motion,
    backend: &dyn NarrowPhaseBackend,
    request: &ContinuousCollisionRequest,
    result: &mut ContinuousCollisionResult,
) -> Real {
    match request.ccd_solver_type {
        CcdSolverKind::Naive => {
            continuous_collide_naive(&*o1, motion1, &*o2, motion2, backend, request, result)
        }
        CcdSolverKind::ConservativeAdvancement => continuous_collide_conservative_advancement(
            &*o1, motion1, &*o2, motion2, backend, request, result,
        ),
        CcdSolverKind::RayShooting => {
            if o1.object_kind() == ObjectKind::Geometric
                && o2.object_kind() == ObjectKind::Geometric
                && request.ccd_motion_type == MotionKind::Translation
            {
                log::warn!("ray-shooting continuous collision is reserved and not implemented");
            } else {
                log::warn!("invalid continuous collision setting");
            }
            -1.0
        }
        CcdSolverKind::PolynomialSolver => {
            if o1.object_kind() == ObjectKind::Bvh
                && o2.object_kind() == ObjectKind::Bvh
                && request.ccd_motion_type == MotionKind::Translation
            {
                let (Some(translation1), Some(translation2)) =
                    (motion1.as_translation(), motion2.as_translation())
                else {
                    log::warn!("the polynomial CCD solver requires translation motions");
                    return -1.0;
                };
                continuous_collide_bvh_polynomial(
                    o1,
                    translation1,
                    o2,
                    translation2,
                    backend,
                    result,
                )
            } else {
                log::warn!("invalid continuous collision checking");
                -1.0
            }
        }
    }
}

/// Continuous collision check between two geometries moving from their begin
/// to their end transforms.
///
/// Both motions are built by the motion factory from the request's motion
/// family.
pub fn continuous_collide_between(
    o1: &mut dyn CollisionGeometry,
    tf1_beg: &Isometry<Real>,
    tf1_end: &Isometry<Real>,
    o2: &mut dyn CollisionGeometry,
    tf2_beg: &Isometry<Real>,
    tf2_end: &Isometry<Real>,
    backend: &dyn NarrowPhaseBackend,
    request: &ContinuousCollisionRequest,
    result: &mut ContinuousCollisionResult,
) -> Real {
    let motion1 = motion_from_transforms(tf1_beg, tf1_end, request.ccd_motion_type);
    let motion2 = motion_from_transforms(tf2_beg, tf2_end, request.ccd_motion_type);

    continuous_collide(o1, &*motion1, o2, &*motion2, backend, request, result)
}
