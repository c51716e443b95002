//! Scoring primitives.
//!
//! A hypothesis is scored by the number of correspondences it explains. The
//! adjacency-constrained scoring additionally requires every inlier to be
//! physically adjacent to the whole sample, and asks a clique oracle whether
//! the inliers hold enough well-spread, mutually consistent points to be
//! trusted.

use crate::adjacency::AdjacencyMatrix;
use crate::clique::{induced_subgraph, is_clique, CliqueOracle};
use crate::core::Scoring;
use crate::models::RigidTransform;
use crate::types::DataMatrix;

/// Inlier-count score. Higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Score {
    pub inlier_count: usize,
}

impl Score {
    pub fn new(inlier_count: usize) -> Self {
        Self { inlier_count }
    }
}

/// Scoring of rigid transforms constrained by the adjacency relations.
///
/// Only `candidates` (sorted) are considered. A candidate is an inlier when
/// its squared residual is below the squared threshold and it is physically
/// adjacent to every other member of the sample the model was fitted on.
pub struct AdjacencyInlierScoring<'a, O: CliqueOracle + ?Sized> {
    physical: &'a AdjacencyMatrix,
    sample_adjacency: &'a AdjacencyMatrix,
    candidates: &'a [usize],
    squared_threshold: f64,
    oracle: &'a O,
    min_clique_size: usize,
    best_inlier_number: usize,
}

impl<'a, O: CliqueOracle + ?Sized> AdjacencyInlierScoring<'a, O> {
    pub fn new(
        physical: &'a AdjacencyMatrix,
        sample_adjacency: &'a AdjacencyMatrix,
        candidates: &'a [usize],
        squared_threshold: f64,
        oracle: &'a O,
        min_clique_size: usize,
    ) -> Self {
        Self {
            physical,
            sample_adjacency,
            candidates,
            squared_threshold,
            oracle,
            min_clique_size,
            best_inlier_number: 0,
        }
    }

    /// Size of the largest inlier set validated so far.
    pub fn best_inlier_number(&self) -> usize {
        self.best_inlier_number
    }

    fn compatible_with_sample(&self, index: usize, sample: &[usize]) -> bool {
        sample
            .iter()
            .all(|&s| s == index || self.physical.test(index, s))
    }
}

impl<O: CliqueOracle + ?Sized> Scoring<RigidTransform> for AdjacencyInlierScoring<'_, O> {
    type Score = Score;

    fn threshold(&self) -> f64 {
        self.squared_threshold.sqrt()
    }

    fn score(
        &mut self,
        data: &DataMatrix,
        model: &RigidTransform,
        sample: &[usize],
        inliers_out: &mut Vec<usize>,
    ) -> Self::Score {
        inliers_out.clear();

        let within: Vec<usize> = self
            .candidates
            .iter()
            .copied()
            .filter(|&i| model.squared_residual(data, i) < self.squared_threshold)
            .collect();

        // A model that does not explain its own sample is meaningless.
        if sample.iter().any(|s| within.binary_search(s).is_err()) {
            return Score::default();
        }

        inliers_out.extend(
            within
                .into_iter()
                .filter(|&i| self.compatible_with_sample(i, sample)),
        );

        // Cannot beat the best: skip the clique search.
        if inliers_out.len() < self.best_inlier_number {
            return Score::new(inliers_out.len());
        }

        // Only an answer that really is a clique of the graph counts.
        let graph = induced_subgraph(self.sample_adjacency, inliers_out);
        let clique_size = self
            .oracle
            .find_clique(&graph, self.min_clique_size)
            .filter(|clique| is_clique(&graph, clique))
            .map_or(0, |clique| clique.len());
        if clique_size < self.min_clique_size {
            inliers_out.clear();
            return Score::default();
        }

        self.best_inlier_number = inliers_out.len();
        Score::new(inliers_out.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clique::{CliqueGraph, TrustCandidates};
    use nalgebra::{Point3, Translation3, UnitQuaternion, Vector3};
    use petgraph::graph::NodeIndex;

    /// Ten points of one instance plus two far-away points that happen to fit.
    fn scene() -> (DataMatrix, RigidTransform, AdjacencyMatrix, AdjacencyMatrix) {
        let truth = RigidTransform::new(
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.4),
            Translation3::new(0.1, 0.0, -1.0),
        );
        let n = 12;
        let mut data = DataMatrix::zeros(n, 6);
        for row in 0..n {
            let q = Point3::new(
                (row % 4) as f64 * 0.05,
                (row / 4) as f64 * 0.05,
                1.0 + (row % 3) as f64 * 0.02,
            );
            let m = truth.transform_point(&q);
            data.row_mut(row)
                .copy_from_slice(&[q.x, q.y, q.z, m.x, m.y, m.z]);
        }

        let mut physical = AdjacencyMatrix::new(n);
        let mut sample = AdjacencyMatrix::new(n);
        for i in 0..10 {
            for j in (i + 1)..10 {
                physical.set_sorted(i, j);
                sample.set_sorted(i, j);
            }
        }
        // 10 is adjacent to part of the sample only, 11 to nobody.
        physical.set_sorted(10, 0);
        physical.set_sorted(10, 1);
        (data, truth, physical, sample)
    }

    #[test]
    fn inliers_must_be_adjacent_to_the_whole_sample() {
        let (data, truth, physical, sample_adj) = scene();
        let candidates: Vec<usize> = (0..12).collect();
        let mut scoring = AdjacencyInlierScoring::new(
            &physical,
            &sample_adj,
            &candidates,
            1e-4,
            &TrustCandidates,
            8,
        );

        let mut inliers = Vec::new();
        let score = scoring.score(&data, &truth, &[0, 1, 2], &mut inliers);
        assert_eq!(inliers, (0..10).collect::<Vec<_>>());
        assert_eq!(score, Score::new(10));
        assert_eq!(scoring.best_inlier_number(), 10);
        assert!((scoring.threshold() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn sample_outside_the_threshold_rejects_the_model() {
        let (mut data, truth, physical, sample_adj) = scene();
        data[(2, 3)] += 0.5;
        let candidates: Vec<usize> = (0..12).collect();
        let mut scoring = AdjacencyInlierScoring::new(
            &physical,
            &sample_adj,
            &candidates,
            1e-4,
            &TrustCandidates,
            8,
        );

        let mut inliers = vec![42];
        let score = scoring.score(&data, &truth, &[0, 1, 2], &mut inliers);
        assert!(inliers.is_empty());
        assert_eq!(score, Score::default());
    }

    #[test]
    fn oracle_failure_rejects_the_inlier_set() {
        let (data, truth, physical, sample_adj) = scene();
        let candidates: Vec<usize> = (0..12).collect();
        let reject = |_: &CliqueGraph, _: usize| -> Option<Vec<NodeIndex>> { None };
        let mut scoring =
            AdjacencyInlierScoring::new(&physical, &sample_adj, &candidates, 1e-4, &reject, 8);

        let mut inliers = Vec::new();
        let score = scoring.score(&data, &truth, &[0, 1, 2], &mut inliers);
        assert!(inliers.is_empty());
        assert_eq!(score.inlier_count, 0);
        assert_eq!(scoring.best_inlier_number(), 0);

        // Too few candidates for the minimum clique size.
        let few: Vec<usize> = (0..5).collect();
        let mut scoring = AdjacencyInlierScoring::new(
            &physical,
            &sample_adj,
            &few,
            1e-4,
            &TrustCandidates,
            8,
        );
        scoring.score(&data, &truth, &[0, 1, 2], &mut inliers);
        assert!(inliers.is_empty());
    }

    #[test]
    fn oracle_answers_that_are_not_cliques_are_ignored() {
        let (data, truth, physical, sample_adj) = scene();
        let candidates: Vec<usize> = (0..12).collect();
        let repeated = |_: &CliqueGraph, min: usize| -> Option<Vec<NodeIndex>> {
            Some(vec![NodeIndex::new(0); min])
        };
        let unknown = |g: &CliqueGraph, min: usize| -> Option<Vec<NodeIndex>> {
            Some((0..min).map(|k| NodeIndex::new(g.node_count() + k)).collect())
        };

        let mut inliers = Vec::new();
        let mut scoring =
            AdjacencyInlierScoring::new(&physical, &sample_adj, &candidates, 1e-4, &repeated, 8);
        assert_eq!(scoring.score(&data, &truth, &[0, 1, 2], &mut inliers), Score::default());
        assert!(inliers.is_empty());

        let mut scoring =
            AdjacencyInlierScoring::new(&physical, &sample_adj, &candidates, 1e-4, &unknown, 8);
        assert_eq!(scoring.score(&data, &truth, &[0, 1, 2], &mut inliers), Score::default());
        assert_eq!(scoring.best_inlier_number(), 0);
    }

    #[test]
    fn smaller_sets_skip_validation() {
        let (data, truth, physical, sample_adj) = scene();
        let candidates: Vec<usize> = (0..12).collect();
        let calls = std::cell::Cell::new(0);
        let counting = |g: &CliqueGraph, min: usize| -> Option<Vec<NodeIndex>> {
            calls.set(calls.get() + 1);
            TrustCandidates.find_clique(g, min)
        };
        let mut scoring =
            AdjacencyInlierScoring::new(&physical, &sample_adj, &candidates, 1e-4, &counting, 8);

        let mut inliers = Vec::new();
        scoring.score(&data, &truth, &[0, 1, 2], &mut inliers);
        assert_eq!(calls.get(), 1);

        // Sample {0, 1, 10}: 10 is adjacent to 0 and 1 only, so fewer inliers survive.
        let score = scoring.score(&data, &truth, &[0, 1, 10], &mut inliers);
        assert_eq!(calls.get(), 1);
        assert_eq!(score, Score::new(3));
    }
}
