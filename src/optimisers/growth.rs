//! Iterative inlier growth.
//!
//! Starting from the consensus inliers, alternately refit the transform on
//! all inliers and admit remaining correspondences that now fall within the
//! threshold. Points are only ever added, never removed. Once a pass admits
//! nothing, one last pass runs with the squared threshold multiplied by the
//! loosening factor, and growth stops.

use crate::core::Estimator;
use crate::estimators::RigidTransformEstimator;
use crate::models::RigidTransform;
use crate::optimisers::LocalOptimizer;
use crate::scoring::Score;
use crate::types::DataMatrix;
use crate::utils::{sorted_difference, sorted_merge};

/// Growth stage run on the best consensus hypothesis.
pub struct InlierGrowthOptimizer {
    /// Sorted indices that may still be admitted (valid correspondences).
    pub candidates: Vec<usize>,
    /// Squared distance threshold of the regular passes.
    pub squared_threshold: f64,
    /// Factor applied to `squared_threshold` for the final pass.
    pub loosening: f64,
    /// Least-squares refit over the current inliers.
    pub estimator: RigidTransformEstimator,
}

impl InlierGrowthOptimizer {
    pub fn new(candidates: Vec<usize>, squared_threshold: f64, loosening: f64) -> Self {
        Self {
            candidates,
            squared_threshold,
            loosening,
            estimator: RigidTransformEstimator::new(),
        }
    }

    /// Grow `inliers` (sorted) around `model`.
    pub fn grow(
        &self,
        data: &DataMatrix,
        inliers: &[usize],
        model: &RigidTransform,
    ) -> (RigidTransform, Vec<usize>) {
        let mut inliers = inliers.to_vec();
        let mut remaining = sorted_difference(&self.candidates, &inliers);
        let mut model = model.clone();
        let mut threshold = self.squared_threshold;
        let mut final_pass = false;
        let mut pass = 0usize;

        loop {
            if let Some(refit) = self
                .estimator
                .estimate_model_nonminimal(data, &inliers)
                .into_iter()
                .next()
            {
                model = refit;
            }

            let admitted: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&i| model.squared_residual(data, i) < threshold)
                .collect();

            log::debug!(
                "growth pass {}: {} inliers, {} admitted (squared threshold {:.3e})",
                pass,
                inliers.len(),
                admitted.len(),
                threshold
            );

            inliers = sorted_merge(&inliers, &admitted);
            remaining = sorted_difference(&remaining, &admitted);
            pass += 1;

            if final_pass {
                break;
            }
            if admitted.is_empty() {
                final_pass = true;
                threshold *= self.loosening;
            }
        }

        (model, inliers)
    }
}

impl LocalOptimizer<RigidTransform, Score> for InlierGrowthOptimizer {
    fn run(
        &mut self,
        data: &DataMatrix,
        inliers: &[usize],
        model: &RigidTransform,
        _best_score: &Score,
    ) -> (RigidTransform, Score, Vec<usize>) {
        let (model, inliers) = self.grow(data, inliers, model);
        (model, Score::new(inliers.len()), inliers)
    }
}
