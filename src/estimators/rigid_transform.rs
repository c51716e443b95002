//! Rigid transform estimator using the closed-form absolute-orientation solution.

use nalgebra::{Matrix3, Point3, Vector3};

use crate::core::Estimator;
use crate::models::RigidTransform;
use crate::types::{DataMatrix, CORRESPONDENCE_COLS};

/// Relative tolerance below which a sample is considered collinear.
const COLLINEARITY_TOLERANCE: f64 = 1e-9;

/// Rigid transform estimator mapping the observed points (columns `0..3`)
/// onto the model points (columns `3..6`).
///
/// The fit centers both point sets, decomposes their 3x3 cross-covariance by
/// SVD and sets `R = V·Uᵗ`, flipping the third column of `V` when
/// `det(U)·det(V) < 0` so that `R` is a proper rotation. The translation is
/// `t = c_model − R·c_query`.
#[derive(Debug, Clone, Copy)]
pub struct RigidTransformEstimator {
    sample_size: usize,
}

impl Default for RigidTransformEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RigidTransformEstimator {
    pub fn new() -> Self {
        Self { sample_size: 3 }
    }

    /// Estimator drawing `sample_size` correspondences per hypothesis (at least 3).
    pub fn with_sample_size(sample_size: usize) -> Self {
        Self {
            sample_size: sample_size.max(3),
        }
    }

    /// Least-squares rigid fit over the rows in `sample`.
    ///
    /// Returns `None` for fewer than three rows or when the SVD fails.
    pub fn fit(data: &DataMatrix, sample: &[usize]) -> Option<RigidTransform> {
        if sample.len() < 3 || data.ncols() < CORRESPONDENCE_COLS {
            return None;
        }

        let n = sample.len() as f64;
        let mut c_query = Vector3::zeros();
        let mut c_model = Vector3::zeros();
        for &idx in sample {
            c_query += query_point(data, idx).coords;
            c_model += model_point(data, idx).coords;
        }
        c_query /= n;
        c_model /= n;

        let mut h = Matrix3::zeros();
        for &idx in sample {
            let q = query_point(data, idx).coords - c_query;
            let m = model_point(data, idx).coords - c_model;
            h += q * m.transpose();
        }

        if h.iter().any(|x| !x.is_finite()) {
            return None;
        }

        let svd = h.svd(true, true);
        let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
            return None;
        };
        let mut v = v_t.transpose();

        if u.determinant() * v.determinant() < 0.0 {
            v.column_mut(2).neg_mut();
        }

        let r = v * u.transpose();
        let t = c_model - r * c_query;

        Some(RigidTransform::from_rt(r, t))
    }
}

fn query_point(data: &DataMatrix, row: usize) -> Point3<f64> {
    Point3::new(data[(row, 0)], data[(row, 1)], data[(row, 2)])
}

fn model_point(data: &DataMatrix, row: usize) -> Point3<f64> {
    Point3::new(data[(row, 3)], data[(row, 4)], data[(row, 5)])
}

/// Whether the points do not all lie on one line.
fn spans_plane(points: &[Point3<f64>]) -> bool {
    let Some(origin) = points.first() else {
        return false;
    };
    let Some(far) = points
        .iter()
        .max_by(|a, b| (*a - origin).norm_squared().total_cmp(&(*b - origin).norm_squared()))
    else {
        return false;
    };

    let axis = far - origin;
    let scale_sq = axis.norm_squared();
    if scale_sq <= f64::EPSILON {
        return false;
    }

    points.iter().any(|p| {
        let area_sq = axis.cross(&(p - origin)).norm_squared();
        area_sq > COLLINEARITY_TOLERANCE * scale_sq * scale_sq
    })
}

impl Estimator for RigidTransformEstimator {
    type Model = RigidTransform;

    fn sample_size(&self) -> usize {
        self.sample_size
    }

    fn is_valid_sample(&self, data: &DataMatrix, sample: &[usize]) -> bool {
        if sample.len() < 3 || data.ncols() < CORRESPONDENCE_COLS {
            return false;
        }
        for i in 0..sample.len() {
            for j in (i + 1)..sample.len() {
                if sample[i] == sample[j] {
                    return false;
                }
            }
        }

        let query: Vec<_> = sample.iter().map(|&i| query_point(data, i)).collect();
        let model: Vec<_> = sample.iter().map(|&i| model_point(data, i)).collect();
        spans_plane(&query) && spans_plane(&model)
    }

    fn estimate_model(&self, data: &DataMatrix, sample: &[usize]) -> Vec<Self::Model> {
        Self::fit(data, sample).into_iter().collect()
    }

    fn is_valid_model(
        &self,
        model: &Self::Model,
        _data: &DataMatrix,
        _sample: &[usize],
        _threshold: f64,
    ) -> bool {
        let det = model.rotation_matrix().determinant();
        (det - 1.0).abs() < 1e-6 && model.translation.vector.iter().all(|x| x.is_finite())
    }
}
