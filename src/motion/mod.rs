//! Parametric rigid motions driving continuous-collision queries.

use crate::math::{Isometry, Real, Translation, UnitQuaternion, UnitVector, Vector};

/// The parameterisation family of a continuous motion.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MotionKind {
    /// Constant-velocity translation, no rotation.
    Translation,
    /// Linear interpolation of the translation, spherical interpolation of
    /// the rotation.
    Interpolation,
    /// Screw motion: rotation about a fixed axis combined with a slide along
    /// it.
    Screw,
    /// Cubic B-spline interpolation of the translation and of the rotation
    /// vector.
    Spline,
}

/// A continuous rigid motion.
///
/// This is a function, assumed to be continuous, that maps a parameter
/// `t ∈ [0, 1]` to a direct isometry.
pub trait Motion {
    /// The family this motion belongs to.
    fn kind(&self) -> MotionKind;

    /// The transform reached at the parameter `t`.
    fn transform_at(&self, t: Real) -> Isometry<Real>;

    /// This motion seen as a pure translation, if it is one.
    fn as_translation(&self) -> Option<&TranslationMotion> {
        None
    }
}

/// Builds the motion of the requested kind going from `tf_beg` at `t = 0` to
/// `tf_end` at `t = 1`.
pub fn motion_from_transforms(
    tf_beg: &Isometry<Real>,
    tf_end: &Isometry<Real>,
    kind: MotionKind,
) -> Box<dyn Motion> {
    match kind {
        MotionKind::Translation => Box::new(TranslationMotion::new(tf_beg, tf_end)),
        MotionKind::Interpolation => Box::new(InterpMotion::new(tf_beg, tf_end)),
        MotionKind::Screw => Box::new(ScrewMotion::new(tf_beg, tf_end)),
        MotionKind::Spline => Box::new(SplineMotion::new(tf_beg, tf_end)),
    }
}

/// A motion translating at constant velocity, keeping the start orientation.
pub struct TranslationMotion {
    start: Isometry<Real>,
    velocity: Vector<Real>,
}

impl TranslationMotion {
    /// A translation covering the displacement between the two transforms.
    ///
    /// Any rotation difference between `tf_beg` and `tf_end` is ignored.
    pub fn new(tf_beg: &Isometry<Real>, tf_end: &Isometry<Real>) -> Self {
        Self {
            start: *tf_beg,
            velocity: tf_end.translation.vector - tf_beg.translation.vector,
        }
    }

    /// The displacement covered over the whole parameter interval.
    pub fn velocity(&self) -> Vector<Real> {
        self.velocity
    }
}

impl Motion for TranslationMotion {
    fn kind(&self) -> MotionKind {
        MotionKind::Translation
    }

    fn transform_at(&self, t: Real) -> Isometry<Real> {
        Isometry::from_parts(
            (self.start.translation.vector + self.velocity * t).into(),
            self.start.rotation,
        )
    }

    fn as_translation(&self) -> Option<&TranslationMotion> {
        Some(self)
    }
}

/// Interpolation between two isometries using LERP for the translation part
/// and SLERP for the rotation part.
pub struct InterpMotion {
    start: Isometry<Real>,
    end: Isometry<Real>,
}

impl InterpMotion {
    /// A lerp-slerp motion between the two given transforms.
    pub fn new(tf_beg: &Isometry<Real>, tf_end: &Isometry<Real>) -> Self {
        Self {
            start: *tf_beg,
            end: *tf_end,
        }
    }
}

impl Motion for InterpMotion {
    fn kind(&self) -> MotionKind {
        MotionKind::Interpolation
    }

    fn transform_at(&self, t: Real) -> Isometry<Real> {
        self.start.lerp_slerp(&self.end, t)
    }
}

enum ScrewParams {
    /// The relative motion carries no rotation.
    Slide(Vector<Real>),
    Screw {
        axis: UnitVector<Real>,
        /// A point on the screw axis.
        point: Vector<Real>,
        angle: Real,
        /// Translation along the axis over the whole interval.
        slide: Real,
    },
}

/// A screw motion: the Chasles decomposition of the relative displacement
/// into a rotation about a fixed axis and a slide along that axis.
pub struct ScrewMotion {
    start: Isometry<Real>,
    params: ScrewParams,
}

impl ScrewMotion {
    /// The screw motion between the two given transforms.
    pub fn new(tf_beg: &Isometry<Real>, tf_end: &Isometry<Real>) -> Self {
        let rel = tf_end * tf_beg.inverse();
        let translation = rel.translation.vector;

        let params = match rel.rotation.axis_angle() {
            None => ScrewParams::Slide(translation),
            Some((axis, angle)) => {
                let slide = axis.dot(&translation);
                let perp = translation - axis.into_inner() * slide;
                // Solves (I - R) p = t_perp for a point p on the axis.
                let point = (perp + axis.cross(&perp) / (angle * 0.5).tan()) * 0.5;
                ScrewParams::Screw {
                    axis,
                    point,
                    angle,
                    slide,
                }
            }
        };

        Self {
            start: *tf_beg,
            params,
        }
    }
}

impl Motion for ScrewMotion {
    fn kind(&self) -> MotionKind {
        MotionKind::Screw
    }

    fn transform_at(&self, t: Real) -> Isometry<Real> {
        let delta = match &self.params {
            ScrewParams::Slide(v) => Isometry::from_parts(
                Translation::from(v * t),
                UnitQuaternion::identity(),
            ),
            ScrewParams::Screw {
                axis,
                point,
                angle,
                slide,
            } => {
                let rot = UnitQuaternion::from_axis_angle(axis, angle * t);
                let about_axis = Translation::from(*point) * rot * Translation::from(-point);
                Translation::from(axis.into_inner() * (slide * t)) * about_axis
            }
        };

        delta * self.start
    }
}

/// A uniform cubic B-spline motion interpolating two transforms.
///
/// The four control values are chosen so that the spline reaches `tf_beg` at
/// `t = 0` and `tf_end` at `t = 1`. Rotations are splined on their rotation
/// vector and mapped back through the exponential.
pub struct SplineMotion {
    translation_controls: [Vector<Real>; 4],
    rotation_controls: [Vector<Real>; 4],
}

impl SplineMotion {
    /// The spline motion between the two given transforms.
    pub fn new(tf_beg: &Isometry<Real>, tf_end: &Isometry<Real>) -> Self {
        Self {
            translation_controls: Self::interpolating_controls(
                tf_beg.translation.vector,
                tf_end.translation.vector,
            ),
            rotation_controls: Self::interpolating_controls(
                tf_beg.rotation.scaled_axis(),
                tf_end.rotation.scaled_axis(),
            ),
        }
    }

    // Control values making the cubic B-spline interpolate `a` at 0 and `b`
    // at 1: S(0) = (C0 + 4 C1 + C2) / 6 and S(1) = (C1 + 4 C2 + C3) / 6.
    fn interpolating_controls(a: Vector<Real>, b: Vector<Real>) -> [Vector<Real>; 4] {
        [a * 2.0 - b, a, b, b * 2.0 - a]
    }

    fn basis(t: Real) -> [Real; 4] {
        let t2 = t * t;
        let t3 = t2 * t;
        [
            (1.0 - t).powi(3) / 6.0,
            (3.0 * t3 - 6.0 * t2 + 4.0) / 6.0,
            (-3.0 * t3 + 3.0 * t2 + 3.0 * t + 1.0) / 6.0,
            t3 / 6.0,
        ]
    }

    fn blend(controls: &[Vector<Real>; 4], basis: &[Real; 4]) -> Vector<Real> {
        controls[0] * basis[0]
            + controls[1] * basis[1]
            + controls[2] * basis[2]
            + controls[3] * basis[3]
    }
}

impl Motion for SplineMotion {
    fn kind(&self) -> MotionKind {
        MotionKind::Spline
    }

    fn transform_at(&self, t: Real) -> Isometry<Real> {
        let basis = Self::basis(t);
        let translation = Self::blend(&self.translation_controls, &basis);
        let rotation = UnitQuaternion::from_scaled_axis(Self::blend(&self.rotation_controls, &basis));
        Isometry::from_parts(translation.into(), rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point;
    use std::f64::consts::FRAC_PI_2;

    fn endpoints() -> (Isometry<Real>, Isometry<Real>) {
        let beg = Isometry::translation(1.0, 0.0, 0.0);
        let end = Isometry::new(Vector::new(3.0, 2.0, -1.0), Vector::new(0.0, 0.0, FRAC_PI_2));
        (beg, end)
    }

    #[test]
    fn every_motion_kind_interpolates_its_endpoints() {
        let (beg, end) = endpoints();

        for kind in [
            MotionKind::Interpolation,
            MotionKind::Screw,
            MotionKind::Spline,
        ] {
            let motion = motion_from_transforms(&beg, &end, kind);
            assert_relative_eq!(motion.transform_at(0.0), beg, epsilon = 1.0e-9);
            assert_relative_eq!(motion.transform_at(1.0), end, epsilon = 1.0e-9);
        }

        // The translation motion only covers the displacement.
        let motion = motion_from_transforms(&beg, &end, MotionKind::Translation);
        assert_relative_eq!(motion.transform_at(0.0), beg, epsilon = 1.0e-9);
        assert_relative_eq!(
            motion.transform_at(1.0).translation.vector,
            end.translation.vector,
            epsilon = 1.0e-9
        );
        assert_relative_eq!(motion.transform_at(1.0).rotation, beg.rotation);
    }

    #[test]
    fn translation_motion_exposes_its_velocity() {
        let (beg, end) = endpoints();
        let motion = TranslationMotion::new(&beg, &end);
        assert_relative_eq!(motion.velocity(), Vector::new(2.0, 2.0, -1.0));
        assert!(motion.as_translation().is_some());
    }

    #[test]
    fn interp_midpoint_averages_translations() {
        let beg = Isometry::translation(0.0, 0.0, 0.0);
        let end = Isometry::translation(4.0, -2.0, 6.0);
        let motion = InterpMotion::new(&beg, &end);
        assert_relative_eq!(
            motion.transform_at(0.5).translation.vector,
            Vector::new(2.0, -1.0, 3.0),
            epsilon = 1.0e-12
        );
    }

    #[test]
    fn screw_motion_rotates_about_a_fixed_axis() {
        // A quarter turn about the z axis through (1, 0, 0): the origin
        // sweeps a circular arc around that point.
        let beg = Isometry::identity();
        let end = Isometry::from_parts(
            Translation::from(Vector::new(1.0, 1.0, 0.0)),
            UnitQuaternion::from_axis_angle(&Vector::z_axis(), -FRAC_PI_2),
        );
        let motion = ScrewMotion::new(&beg, &end);

        assert_relative_eq!(motion.transform_at(0.0), beg, epsilon = 1.0e-9);
        assert_relative_eq!(motion.transform_at(1.0), end, epsilon = 1.0e-9);

        // The screw axis point stays fixed for every parameter.
        let pivot = Point::new(1.0, 0.0, 0.0);
        let half = motion.transform_at(0.5);
        let moved = half * pivot;
        assert_relative_eq!(moved, pivot, epsilon = 1.0e-9);
    }
}
