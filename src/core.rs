//! Core sample-consensus traits and the generic consensus loop.
//!
//! - Traits for estimators, samplers, scoring and termination.
//! - A generic `SampleConsensus` struct that orchestrates these components
//!   and hands the best hypothesis to an optional final optimizer.

use crate::optimisers::LocalOptimizer;
use crate::types::DataMatrix;

/// Estimator responsible for generating model hypotheses from samples.
pub trait Estimator {
    /// Model type produced by this estimator.
    type Model: Clone;

    /// Size of a minimal sample for this estimator.
    fn sample_size(&self) -> usize;

    /// Check whether a given sample is geometrically valid.
    fn is_valid_sample(&self, data: &DataMatrix, sample: &[usize]) -> bool;

    /// Estimate candidate models from a minimal sample.
    fn estimate_model(&self, data: &DataMatrix, sample: &[usize]) -> Vec<Self::Model>;

    /// Estimate a model from more than the minimal number of points.
    fn estimate_model_nonminimal(&self, data: &DataMatrix, sample: &[usize]) -> Vec<Self::Model> {
        self.estimate_model(data, sample)
    }

    /// Validate a candidate model before scoring.
    fn is_valid_model(
        &self,
        model: &Self::Model,
        data: &DataMatrix,
        sample: &[usize],
        threshold: f64,
    ) -> bool;
}

/// Sampler responsible for drawing minimal samples from the data.
pub trait Sampler {
    /// Draw a sample of `sample_size` elements into `out_indices`.
    ///
    /// Returns `false` if a valid sample could not be drawn.
    fn sample(&mut self, data: &DataMatrix, sample_size: usize, out_indices: &mut [usize]) -> bool;

    /// Whether no further sample can ever be drawn from the current pool.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Scoring strategy used to evaluate model quality and determine inliers.
pub trait Scoring<M> {
    /// Score type – must support ordering for "better than" comparisons.
    type Score: Clone + PartialOrd;

    /// Inlier/outlier distance threshold.
    fn threshold(&self) -> f64;

    /// Score a model fitted on `sample` and return its inlier set.
    ///
    /// An empty `inliers_out` marks the model as rejected.
    fn score(
        &mut self,
        data: &DataMatrix,
        model: &M,
        sample: &[usize],
        inliers_out: &mut Vec<usize>,
    ) -> Self::Score;
}

/// Termination criterion deciding when the consensus loop can stop.
pub trait TerminationCriterion<S> {
    /// Update the termination state after the best score improved.
    ///
    /// `point_count` is the number of correspondences taking part in the run.
    /// Returns `true` if the loop should terminate immediately.
    fn check(
        &mut self,
        point_count: usize,
        best_score: &S,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool;
}

/// RANSAC termination criterion that shrinks the iteration budget using the
/// current best inlier ratio and desired confidence.
///
/// The update rule follows the standard formula
/// `N = log(1 - confidence) / log(1 - inlier_ratio^sample_size)`.
pub struct RansacTerminationCriterion {
    /// Desired confidence in \[0, 1\).
    pub confidence: f64,
}

impl TerminationCriterion<crate::scoring::Score> for RansacTerminationCriterion {
    fn check(
        &mut self,
        point_count: usize,
        best_score: &crate::scoring::Score,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool {
        if point_count == 0 {
            return false;
        }

        let inlier_ratio = (best_score.inlier_count as f64 / point_count as f64).clamp(0.0, 1.0);
        if inlier_ratio <= 0.0 {
            return false;
        }

        let p_good_sample = inlier_ratio.powi(sample_size as i32);
        if p_good_sample >= 1.0 {
            // Every sample is all-inlier, one more iteration cannot do better.
            *max_iterations = (*max_iterations).min(1);
            return false;
        }

        let log_one_minus_conf = (1.0 - self.confidence).ln();
        let log_one_minus_p = (1.0 - p_good_sample).ln();
        if !log_one_minus_conf.is_finite() || !log_one_minus_p.is_finite() {
            return false;
        }

        let required = (log_one_minus_conf / log_one_minus_p).ceil().max(1.0) as usize;
        if required < *max_iterations {
            *max_iterations = required;
        }

        false
    }
}

/// Generic sample-consensus pipeline.
///
/// Runs up to `max_iterations` trials of sample → fit → score, keeps the best
/// scoring model, then passes it through the optional final optimizer.
pub struct SampleConsensus<E, Sa, Sc, LO, T>
where
    E: Estimator,
    Sa: Sampler,
    Sc: Scoring<E::Model>,
    LO: LocalOptimizer<E::Model, Sc::Score>,
    T: TerminationCriterion<Sc::Score>,
{
    pub estimator: E,
    pub sampler: Sa,
    pub scoring: Sc,
    pub final_optimizer: Option<LO>,
    pub termination: T,
    /// Iteration budget.
    pub max_iterations: usize,
    /// Sampling attempts per iteration before the iteration is skipped.
    pub max_sample_attempts: usize,
    /// Number of correspondences taking part, for the termination criterion.
    pub point_count: usize,

    // Outputs / diagnostics
    pub best_model: Option<E::Model>,
    pub best_inliers: Vec<usize>,
    pub best_score: Option<Sc::Score>,
    pub iteration: usize,
    /// Iterations in which no usable sample could be drawn.
    pub skipped_iterations: usize,
}

impl<E, Sa, Sc, LO, T> SampleConsensus<E, Sa, Sc, LO, T>
where
    E: Estimator,
    Sa: Sampler,
    Sc: Scoring<E::Model>,
    LO: LocalOptimizer<E::Model, Sc::Score>,
    T: TerminationCriterion<Sc::Score>,
{
    /// Create a new pipeline from its components.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        estimator: E,
        sampler: Sa,
        scoring: Sc,
        final_optimizer: Option<LO>,
        termination: T,
        max_iterations: usize,
        max_sample_attempts: usize,
        point_count: usize,
    ) -> Self {
        Self {
            estimator,
            sampler,
            scoring,
            final_optimizer,
            termination,
            max_iterations,
            max_sample_attempts,
            point_count,
            best_model: None,
            best_inliers: Vec::new(),
            best_score: None,
            iteration: 0,
            skipped_iterations: 0,
        }
    }

    /// Run the consensus loop on the given data matrix.
    ///
    /// Returns `true` if a model was found.
    pub fn run(&mut self, data: &DataMatrix) -> bool {
        let sample_size = self.estimator.sample_size();
        let mut sample = vec![0usize; sample_size];
        let mut tmp_inliers = Vec::new();

        let mut max_iterations = self.max_iterations;

        self.best_inliers.clear();
        self.best_model = None;
        self.best_score = None;
        self.iteration = 0;
        self.skipped_iterations = 0;

        let threshold = self.scoring.threshold();

        while self.iteration < max_iterations {
            // Try to obtain a valid sample and a valid model.
            let mut models: Vec<E::Model> = Vec::new();

            for _ in 0..self.max_sample_attempts {
                if !self.sampler.sample(data, sample_size, &mut sample[..]) {
                    if self.sampler.is_exhausted() {
                        break;
                    }
                    continue;
                }

                if !self.estimator.is_valid_sample(data, &sample) {
                    continue;
                }

                models = self.estimator.estimate_model(data, &sample);
                if !models.is_empty() {
                    break;
                }
            }

            if models.is_empty() {
                if self.sampler.is_exhausted() {
                    log::debug!(
                        "sampler exhausted after {} iterations, stopping",
                        self.iteration
                    );
                    break;
                }
                self.skipped_iterations += 1;
                self.iteration += 1;
                continue;
            }

            let mut iteration_improved_best = false;

            for model in models.iter() {
                if !self
                    .estimator
                    .is_valid_model(model, data, &sample, threshold)
                {
                    continue;
                }

                tmp_inliers.clear();
                let score = self.scoring.score(data, model, &sample, &mut tmp_inliers);
                if tmp_inliers.is_empty() {
                    continue;
                }

                let better = match &self.best_score {
                    None => true,
                    Some(best) => score > *best,
                };

                if better {
                    self.best_score = Some(score);
                    self.best_model = Some(model.clone());
                    self.best_inliers.clear();
                    self.best_inliers.extend_from_slice(&tmp_inliers);
                    iteration_improved_best = true;
                }
            }

            self.iteration += 1;

            if iteration_improved_best {
                if let Some(best_score) = &self.best_score {
                    let should_terminate = self.termination.check(
                        self.point_count,
                        best_score,
                        sample_size,
                        &mut max_iterations,
                    );
                    if should_terminate {
                        break;
                    }
                }
            }
        }

        if let (Some(final_opt), Some(best_model), Some(best_score)) = (
            &mut self.final_optimizer,
            &self.best_model,
            &self.best_score,
        ) {
            let (refined_model, refined_score, refined_inliers) =
                final_opt.run(data, &self.best_inliers, best_model, best_score);
            self.best_model = Some(refined_model);
            self.best_score = Some(refined_score);
            self.best_inliers = refined_inliers;
        }

        self.best_model.is_some()
    }
}
