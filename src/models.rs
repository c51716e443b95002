//! Rigid transforms and accepted pose hypotheses.

use nalgebra::{
    Isometry3, Matrix3, Matrix4, Point3, Rotation3, Translation3, UnitQuaternion, Vector3,
};
use serde::{Deserialize, Serialize};

use crate::types::{DataMatrix, ObjectId};

/// Rigid transform in 3D (rotation + translation).
///
/// Transforms fitted by the detector map observed points onto model points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Translation3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    pub fn new(rotation: UnitQuaternion<f64>, translation: Translation3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(UnitQuaternion::identity(), Translation3::identity())
    }

    /// Build from a rotation matrix (assumed orthonormal) and a translation.
    pub fn from_rt(r: Matrix3<f64>, t: Vector3<f64>) -> Self {
        let rot = Rotation3::from_matrix_unchecked(r);
        Self::new(UnitQuaternion::from_rotation_matrix(&rot), Translation3::from(t))
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.rotation.to_rotation_matrix().into_inner()
    }

    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(self.translation, self.rotation)
    }

    /// Homogeneous 4x4 form `[R | t; 0 0 0 1]`.
    pub fn to_matrix4(&self) -> Matrix4<f64> {
        self.isometry().to_homogeneous()
    }

    /// The 16 coefficients of [`to_matrix4`](Self::to_matrix4) in row-major order.
    pub fn coefficients(&self) -> [f64; 16] {
        let m = self.to_matrix4();
        let mut out = [0.0; 16];
        for r in 0..4 {
            for c in 0..4 {
                out[4 * r + c] = m[(r, c)];
            }
        }
        out
    }

    /// Rebuild from row-major coefficients; row 3 is ignored.
    pub fn from_coefficients(coefficients: &[f64; 16]) -> Self {
        let r = Matrix3::new(
            coefficients[0],
            coefficients[1],
            coefficients[2],
            coefficients[4],
            coefficients[5],
            coefficients[6],
            coefficients[8],
            coefficients[9],
            coefficients[10],
        );
        let t = Vector3::new(coefficients[3], coefficients[7], coefficients[11]);
        Self::from_rt(r, t)
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.isometry().transform_point(p)
    }

    pub fn inverse(&self) -> Self {
        let inv = self.isometry().inverse();
        Self::new(inv.rotation, inv.translation)
    }

    /// Squared distance between the transformed query point of `row` and its model point.
    pub fn squared_residual(&self, data: &DataMatrix, row: usize) -> f64 {
        let q = Point3::new(data[(row, 0)], data[(row, 1)], data[(row, 2)]);
        let m = Point3::new(data[(row, 3)], data[(row, 4)], data[(row, 5)]);
        (self.transform_point(&q) - m).norm_squared()
    }
}

/// An accepted object instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseHypothesis {
    pub object_id: ObjectId,
    /// Transform mapping observed points onto the object model.
    pub transform: RigidTransform,
    /// Sorted indices of the supporting correspondences.
    pub inliers: Vec<usize>,
}

impl PoseHypothesis {
    /// Pose of the object in the scene frame (model to scene).
    pub fn object_pose(&self) -> RigidTransform {
        self.transform.inverse()
    }
}
