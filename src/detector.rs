//! Pose recovery for one candidate object.
//!
//! [`find_pose`] runs one consensus search (clique sampling, rigid fit,
//! adjacency-constrained scoring, inlier growth) over the still-valid
//! correspondences of a set. [`extract_instances`] repeats it, consuming the
//! observed points of every accepted pose, until no further instance reaches
//! the minimum inlier count.

use nalgebra::Point2;

use crate::clique::CliqueOracle;
use crate::core::{RansacTerminationCriterion, SampleConsensus};
use crate::correspondences::CorrespondenceSet;
use crate::error::DetectionError;
use crate::estimators::RigidTransformEstimator;
use crate::models::PoseHypothesis;
use crate::optimisers::InlierGrowthOptimizer;
use crate::samplers::CliqueSampler;
use crate::scoring::AdjacencyInlierScoring;
use crate::settings::DetectionSettings;
use crate::utils::UniformRandomGenerator;

/// Why the extraction loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every correspondence has been consumed.
    Exhausted,
    /// The consensus search found no acceptable model.
    NoConsensus,
    /// The best candidate (or the whole valid pool) had fewer than the
    /// minimum number of inliers.
    InsufficientInliers { found: usize },
}

/// Poses extracted for one object, in acceptance order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionReport {
    pub poses: Vec<PoseHypothesis>,
    pub stop: StopReason,
}

/// Run one consensus search plus inlier growth on the valid correspondences.
///
/// The adjacency relations of `set` must have been built with
/// [`CorrespondenceSet::fill_adjacency`]. Returns `None` when no sample led
/// to a model accepted by the scoring; the minimum inlier count is not
/// checked here.
pub fn find_pose<O: CliqueOracle + ?Sized>(
    set: &CorrespondenceSet,
    settings: &DetectionSettings,
    oracle: &O,
    rng: &mut UniformRandomGenerator,
) -> Option<PoseHypothesis> {
    let data = set.data_matrix();
    let graphs = set.graphs();
    let valid = set.valid_indices();
    let squared_threshold = settings.squared_threshold();

    let pool = graphs
        .sample
        .sample_pool(valid, settings.min_sample_connectivity);
    log::debug!(
        "object {}: {} valid correspondences, {} can seed a sample",
        set.object_id(),
        valid.len(),
        pool.len()
    );

    let mut consensus = SampleConsensus::new(
        RigidTransformEstimator::with_sample_size(settings.sample_size),
        CliqueSampler::new(&graphs.sample, pool, rng),
        AdjacencyInlierScoring::new(
            &graphs.physical,
            &graphs.sample,
            valid,
            squared_threshold,
            oracle,
            settings.min_clique_size,
        ),
        Some(InlierGrowthOptimizer::new(
            valid.to_vec(),
            squared_threshold,
            settings.growth_loosening,
        )),
        RansacTerminationCriterion {
            confidence: settings.confidence,
        },
        settings.n_ransac_iterations,
        settings.max_sample_attempts,
        valid.len(),
    );

    let found = consensus.run(&data);
    log::debug!(
        "object {}: consensus ran {} iterations ({} skipped), {} inliers",
        set.object_id(),
        consensus.iteration,
        consensus.skipped_iterations,
        consensus.best_inliers.len()
    );
    if !found {
        return None;
    }

    let transform = consensus.best_model.take()?;
    Some(PoseHypothesis {
        object_id: set.object_id().to_string(),
        transform,
        inliers: std::mem::take(&mut consensus.best_inliers),
    })
}

/// Extract every instance of the object described by `set`.
///
/// `keypoints` are the image positions of the observed points, indexed by
/// observed-point identifier. After each accepted pose, every correspondence
/// sharing an observed point with one of its inliers is invalidated. The
/// adjacency relations are rebuilt on entry and dropped on exit; the valid
/// index set of `set` reflects what was consumed.
pub fn extract_instances<O: CliqueOracle + ?Sized>(
    set: &mut CorrespondenceSet,
    keypoints: &[Point2<f64>],
    object_span: f64,
    settings: &DetectionSettings,
    oracle: &O,
) -> Result<ExtractionReport, DetectionError> {
    settings.validate()?;
    set.fill_adjacency(
        keypoints,
        object_span,
        settings.sensor_error,
        settings.min_sample_separation_px,
    )?;

    log::debug!(
        "object {}: {} correspondences over {} observed points",
        set.object_id(),
        set.len(),
        set.distinct_query_ids()
    );

    let mut rng = UniformRandomGenerator::from_optional_seed(settings.seed);
    let mut poses = Vec::new();

    let stop = loop {
        let valid = set.valid_indices().len();
        if valid == 0 {
            break StopReason::Exhausted;
        }
        if valid < settings.min_inliers {
            break StopReason::InsufficientInliers { found: valid };
        }

        let Some(pose) = find_pose(set, settings, oracle, &mut rng) else {
            break StopReason::NoConsensus;
        };
        if pose.inliers.len() < settings.min_inliers {
            break StopReason::InsufficientInliers {
                found: pose.inliers.len(),
            };
        }

        let query_ids: Vec<usize> = pose.inliers.iter().map(|&i| set.query_id(i)).collect();
        let removed = set.invalidate_query_ids(&query_ids);
        log::info!(
            "object {}: accepted pose with {} inliers, {} correspondences consumed",
            set.object_id(),
            pose.inliers.len(),
            removed.len()
        );
        poses.push(pose);
    };

    log::debug!(
        "object {}: stopped after {} poses ({:?})",
        set.object_id(),
        poses.len(),
        stop
    );
    set.clear_adjacency();

    Ok(ExtractionReport { poses, stop })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clique::{CliqueGraph, TrustCandidates};
    use crate::correspondences::Correspondence;
    use crate::models::RigidTransform;
    use nalgebra::{Point3, Translation3, UnitQuaternion, Vector3};
    use petgraph::graph::NodeIndex;

    /// `n` exact correspondences of one instance spread over a 10cm cube,
    /// keypoints 40px apart.
    fn instance(n: usize, truth: &RigidTransform) -> (CorrespondenceSet, Vec<Point2<f64>>) {
        let mut rng = UniformRandomGenerator::from_seed(21);
        let mut coord = || rng.index(1001) as f64 / 10_000.0;
        let mut set = CorrespondenceSet::new("cup");
        let mut keypoints = Vec::new();
        for k in 0..n {
            let query = Point3::new(coord(), coord(), 1.0 + coord());
            set.push(Correspondence {
                query,
                model: truth.transform_point(&query),
                query_id: k,
            });
            keypoints.push(Point2::new((k % 5) as f64 * 40.0, (k / 5) as f64 * 40.0));
        }
        (set, keypoints)
    }

    fn truth() -> RigidTransform {
        RigidTransform::new(
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.7),
            Translation3::new(0.05, -0.02, -1.0),
        )
    }

    fn settings() -> DetectionSettings {
        DetectionSettings {
            seed: Some(17),
            ..DetectionSettings::default()
        }
    }

    #[test]
    fn find_pose_recovers_an_exact_instance() {
        let truth = truth();
        let (mut set, keypoints) = instance(20, &truth);
        set.fill_adjacency(&keypoints, 0.3, 0.01, 20.0).unwrap();

        let mut rng = UniformRandomGenerator::from_seed(4);
        let pose = find_pose(&set, &settings(), &TrustCandidates, &mut rng).unwrap();
        assert_eq!(pose.object_id, "cup");
        assert_eq!(pose.inliers, (0..20).collect::<Vec<_>>());
        assert!(pose.transform.rotation.angle_to(&truth.rotation) < 1e-6);
    }

    #[test]
    fn find_pose_without_adjacency_finds_nothing() {
        let (set, _) = instance(20, &truth());
        let mut rng = UniformRandomGenerator::from_seed(4);
        assert!(find_pose(&set, &settings(), &TrustCandidates, &mut rng).is_none());
    }

    #[test]
    fn extraction_consumes_the_instance_then_stops() {
        let (mut set, keypoints) = instance(20, &truth());
        let report = extract_instances(&mut set, &keypoints, 0.3, &settings(), &TrustCandidates)
            .unwrap();

        assert_eq!(report.poses.len(), 1);
        assert_eq!(report.stop, StopReason::Exhausted);
        assert!(set.valid_indices().is_empty());
        assert!(set.graphs().physical.is_empty());
    }

    #[test]
    fn rejecting_oracle_yields_no_consensus() {
        let (mut set, keypoints) = instance(20, &truth());
        let reject = |_: &CliqueGraph, _: usize| -> Option<Vec<NodeIndex>> { None };
        let report = extract_instances(&mut set, &keypoints, 0.3, &settings(), &reject).unwrap();

        assert!(report.poses.is_empty());
        assert_eq!(report.stop, StopReason::NoConsensus);
        assert_eq!(set.valid_indices().len(), 20);
    }

    #[test]
    fn small_pools_stop_with_insufficient_inliers() {
        let (mut set, keypoints) = instance(10, &truth());
        let report = extract_instances(&mut set, &keypoints, 0.3, &settings(), &TrustCandidates)
            .unwrap();
        assert!(report.poses.is_empty());
        assert_eq!(report.stop, StopReason::InsufficientInliers { found: 10 });

        let strict = DetectionSettings {
            min_inliers: 25,
            ..settings()
        };
        let (mut set, keypoints) = instance(20, &truth());
        let report =
            extract_instances(&mut set, &keypoints, 0.3, &strict, &TrustCandidates).unwrap();
        assert_eq!(report.stop, StopReason::InsufficientInliers { found: 20 });
    }

    #[test]
    fn preconditions_are_checked_before_sampling() {
        let mut empty = CorrespondenceSet::new("empty");
        assert!(matches!(
            extract_instances(&mut empty, &[], 0.3, &settings(), &TrustCandidates),
            Err(DetectionError::EmptyCorrespondenceSet(_))
        ));

        let (mut set, keypoints) = instance(20, &truth());
        assert_eq!(
            extract_instances(&mut set, &keypoints, -0.3, &settings(), &TrustCandidates),
            Err(DetectionError::NonPositiveObjectSpan(-0.3))
        );
        let bad = DetectionSettings {
            n_ransac_iterations: 0,
            ..settings()
        };
        assert!(matches!(
            extract_instances(&mut set, &keypoints, 0.3, &bad, &TrustCandidates),
            Err(DetectionError::InvalidSettings(_))
        ));
    }
}
