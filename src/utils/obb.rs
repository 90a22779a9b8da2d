use crate::bounding_volume::Aabb;
use crate::math::{Isometry, Matrix, Point, Real, Vector};

/// An oriented bounding box.
#[derive(Clone, Debug)]
pub struct Obb {
    /// The world-space center of the box.
    pub center: Point<Real>,
    /// The half-extents of the box along its local axes.
    pub half_extents: Vector<Real>,
    /// The orientation of the box. Columns are the box axes.
    pub axes: Matrix<Real>,
}

impl Obb {
    /// The oriented box covering `aabb` transformed by `tf`.
    pub fn from_aabb(aabb: &Aabb, tf: &Isometry<Real>) -> Self {
        Self {
            center: tf * aabb.center(),
            half_extents: aabb.half_extents(),
            axes: tf.rotation.to_rotation_matrix().into_inner(),
        }
    }

    /// Tests if this box intersects `other`, using the separating-axis
    /// theorem on the 15 candidate axes.
    pub fn intersects(&self, other: &Obb) -> bool {
        let rot = self.axes.transpose() * other.axes;
        // Padding the absolute rotation guards the cross-product axes against
        // near-parallel edge pairs.
        let abs_rot = rot.map(|x| x.abs() + 1.0e-10);
        let t = self.axes.transpose() * (other.center - self.center);
        let a = self.half_extents;
        let b = other.half_extents;

        // Axes of `self`.
        for i in 0..3 {
            let ra = a[i];
            let rb = b[0] * abs_rot[(i, 0)] + b[1] * abs_rot[(i, 1)] + b[2] * abs_rot[(i, 2)];
            if t[i].abs() > ra + rb {
                return false;
            }
        }

        // Axes of `other`.
        for j in 0..3 {
            let ra = a[0] * abs_rot[(0, j)] + a[1] * abs_rot[(1, j)] + a[2] * abs_rot[(2, j)];
            let rb = b[j];
            let dist = (t[0] * rot[(0, j)] + t[1] * rot[(1, j)] + t[2] * rot[(2, j)]).abs();
            if dist > ra + rb {
                return false;
            }
        }

        // Cross products of an axis of `self` with an axis of `other`.
        for i in 0..3 {
            let i1 = (i + 1) % 3;
            let i2 = (i + 2) % 3;
            for j in 0..3 {
                let j1 = (j + 1) % 3;
                let j2 = (j + 2) % 3;
                let ra = a[i1] * abs_rot[(i2, j)] + a[i2] * abs_rot[(i1, j)];
                let rb = b[j1] * abs_rot[(i, j2)] + b[j2] * abs_rot[(i, j1)];
                let dist = (t[i2] * rot[(i1, j)] - t[i1] * rot[(i2, j)]).abs();
                if dist > ra + rb {
                    return false;
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector;

    #[test]
    fn aligned_boxes_behave_like_aabbs() {
        let a = Obb::from_aabb(
            &Aabb::from_half_extents(Point::origin(), Vector::repeat(1.0)),
            &Isometry::identity(),
        );
        let b = Obb::from_aabb(
            &Aabb::from_half_extents(Point::new(1.5, 0.0, 0.0), Vector::repeat(1.0)),
            &Isometry::identity(),
        );
        let c = Obb::from_aabb(
            &Aabb::from_half_extents(Point::new(3.0, 0.0, 0.0), Vector::repeat(0.5)),
            &Isometry::identity(),
        );

        assert!(a.intersects(&b));
        assert!(b.intersects(&c));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn rotated_cube_reaches_farther_than_aligned_one() {
        // Two unit cubes 2.2 apart along x: disjoint when axis-aligned, but a
        // 45-degree twist of the second one points a corner at the first and
        // closes the gap.
        let a = Obb::from_aabb(
            &Aabb::from_half_extents(Point::origin(), Vector::repeat(1.0)),
            &Isometry::identity(),
        );

        let center = Point::new(2.2, 0.0, 0.0);
        let aligned = Obb::from_aabb(
            &Aabb::from_half_extents(center, Vector::repeat(1.0)),
            &Isometry::identity(),
        );
        assert!(!a.intersects(&aligned));
        assert!(!aligned.intersects(&a));

        let rotated = Obb {
            center,
            half_extents: Vector::repeat(1.0),
            axes: na::Rotation3::from_axis_angle(&Vector::z_axis(), std::f64::consts::FRAC_PI_4)
                .into_inner(),
        };
        assert!(a.intersects(&rotated));
        assert!(rotated.intersects(&a));
    }
}
