//! Continuous (time-of-contact) collision queries.

pub use self::continuous_collision::{
    continuous_collide, continuous_collide_between, continuous_collide_conservative_advancement,
    continuous_collide_naive, CcdSolverKind, ConservativeAdvancementFn,
    ConservativeAdvancementMatrix, ContinuousCollisionRequest, ContinuousCollisionResult,
    GjkSolverKind, MeshCcdHit, NarrowPhaseBackend,
};

mod continuous_collision;
