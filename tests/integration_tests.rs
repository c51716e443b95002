//! Integration tests for instance extraction.
//!
//! These tests build synthetic scenes (known rigid motions, Gaussian noise,
//! random outliers) and check the poses recovered through the public API.

use adjacency_ransac::clique::CliqueGraph;
use adjacency_ransac::*;
use nalgebra::{Point2, Point3, Translation3, UnitQuaternion, Vector3};
use petgraph::graph::NodeIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Standard normal sample (Box-Muller), clamped to three standard deviations.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z.clamp(-3.0, 3.0)
}

fn uniform_point(rng: &mut StdRng, center: Point3<f64>, half_width: f64) -> Point3<f64> {
    center
        + Vector3::new(
            rng.gen_range(-half_width..half_width),
            rng.gen_range(-half_width..half_width),
            rng.gen_range(-half_width..half_width),
        )
}

/// Keypoints on a grid with `pitch` pixels between neighbors.
fn grid_keypoints(n: usize, pitch: f64) -> Vec<Point2<f64>> {
    (0..n)
        .map(|k| Point2::new((k % 6) as f64 * pitch, (k / 6) as f64 * pitch))
        .collect()
}

fn seeded_settings() -> DetectionSettings {
    DetectionSettings {
        seed: Some(2024),
        ..DetectionSettings::default()
    }
}

/// 15 noisy inliers of a 30 degree rotation plus 5 unrelated outliers.
fn noisy_scene() -> (CorrespondenceSet, Vec<Point2<f64>>, RigidTransform) {
    let truth = RigidTransform::new(
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 30f64.to_radians()),
        Translation3::new(0.1, -0.05, -0.8),
    );
    let mut rng = StdRng::seed_from_u64(99);
    let center = Point3::new(0.0, 0.0, 1.0);
    let mut set = CorrespondenceSet::new("drill");

    for query_id in 0..15 {
        let query = uniform_point(&mut rng, center, 0.15);
        let noise = Vector3::new(gaussian(&mut rng), gaussian(&mut rng), gaussian(&mut rng)) * 0.002;
        set.push(Correspondence {
            query,
            model: truth.transform_point(&query) + noise,
            query_id,
        });
    }
    for query_id in 15..20 {
        let query = uniform_point(&mut rng, center, 0.15);
        let model = uniform_point(&mut rng, truth.transform_point(&center), 0.15);
        set.push(Correspondence {
            query,
            model,
            query_id,
        });
    }

    (set, grid_keypoints(20, 40.0), truth)
}

#[test]
fn test_single_noisy_instance_with_outliers() {
    let (mut set, keypoints, truth) = noisy_scene();

    let report =
        extract_instances(&mut set, &keypoints, 0.6, &seeded_settings(), &TrustCandidates)
            .expect("valid input");

    assert_eq!(report.poses.len(), 1, "expected exactly one instance");
    let pose = &report.poses[0];
    assert_eq!(pose.object_id, "drill");
    assert!(pose.inliers.len() >= 15, "only {} inliers", pose.inliers.len());
    assert!(pose.inliers.windows(2).all(|w| w[0] < w[1]));
    assert!((0..15).all(|i| pose.inliers.contains(&i)));

    let angle_error = pose.transform.rotation.angle_to(&truth.rotation);
    let translation_error = (pose.transform.translation.vector - truth.translation.vector).norm();
    assert!(angle_error < 0.02, "rotation error {angle_error}");
    assert!(translation_error < 0.03, "translation error {translation_error}");

    // The remainder (at most the 5 outliers) cannot reach the minimum.
    match report.stop {
        StopReason::InsufficientInliers { found } => assert!(found <= 5),
        other => panic!("unexpected stop reason {other:?}"),
    }
    assert!(set.valid_indices().len() <= 5);
}

/// Two exact instances of one object, 2m apart.
fn two_instance_scene() -> (CorrespondenceSet, Vec<Point2<f64>>) {
    let mut rng = StdRng::seed_from_u64(7);
    let model_points: Vec<Point3<f64>> = (0..15)
        .map(|_| uniform_point(&mut rng, Point3::origin(), 0.1))
        .collect();

    // Both poses map the model into the scene; observed points are their images.
    let poses = [
        RigidTransform::new(
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.4),
            Translation3::new(-1.0, 0.0, 1.5),
        ),
        RigidTransform::new(
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -0.9),
            Translation3::new(1.0, 0.0, 1.5),
        ),
    ];

    let mut set = CorrespondenceSet::new("bowl");
    for (instance, pose) in poses.iter().enumerate() {
        for (k, model) in model_points.iter().enumerate() {
            set.push(Correspondence {
                query: pose.transform_point(model),
                model: *model,
                query_id: instance * 15 + k,
            });
        }
    }
    (set, grid_keypoints(30, 30.0))
}

#[test]
fn test_two_separated_instances() {
    let (mut set, keypoints) = two_instance_scene();

    let report =
        extract_instances(&mut set, &keypoints, 0.5, &seeded_settings(), &TrustCandidates)
            .expect("valid input");

    assert_eq!(report.poses.len(), 2);
    assert_eq!(report.stop, StopReason::Exhausted);

    let ids: Vec<Vec<usize>> = report
        .poses
        .iter()
        .map(|pose| pose.inliers.iter().map(|&i| set.query_id(i)).collect())
        .collect();
    assert_eq!(ids[0].len(), 15);
    assert_eq!(ids[1].len(), 15);
    assert!(ids[0].iter().all(|id| !ids[1].contains(id)));

    // Each object pose places the model origin at its instance.
    let mut origins: Vec<f64> = report
        .poses
        .iter()
        .map(|pose| pose.object_pose().transform_point(&Point3::origin()).x)
        .collect();
    origins.sort_by(f64::total_cmp);
    assert!((origins[0] + 1.0).abs() < 1e-6);
    assert!((origins[1] - 1.0).abs() < 1e-6);
}

#[test]
fn test_valid_set_shrinks_monotonically() {
    let (mut set, keypoints) = two_instance_scene();
    let settings = seeded_settings();
    set.fill_adjacency(&keypoints, 0.5, settings.sensor_error, 20.0)
        .expect("valid input");

    let mut rng = utils::UniformRandomGenerator::from_seed(3);
    let mut previous = set.valid_indices().len();
    while let Some(pose) = find_pose(&set, &settings, &TrustCandidates, &mut rng) {
        let ids: Vec<usize> = pose.inliers.iter().map(|&i| set.query_id(i)).collect();
        set.invalidate_query_ids(&ids);
        let now = set.valid_indices().len();
        assert!(now < previous, "valid set did not shrink ({previous} -> {now})");
        previous = now;
        if now == 0 {
            break;
        }
    }
    assert_eq!(previous, 0);
}

#[test]
fn test_rejecting_oracle_finds_nothing() {
    let (mut set, keypoints, _) = noisy_scene();
    let reject = |_: &CliqueGraph, _: usize| -> Option<Vec<NodeIndex>> { None };

    let report = extract_instances(&mut set, &keypoints, 0.6, &seeded_settings(), &reject)
        .expect("valid input");

    assert!(report.poses.is_empty());
    assert_eq!(report.stop, StopReason::NoConsensus);
    assert_eq!(set.valid_indices().len(), 20);
}

#[test]
fn test_empty_set_is_a_precondition_violation() {
    let mut set = CorrespondenceSet::new("ghost");
    let result = extract_instances(&mut set, &[], 0.5, &seeded_settings(), &TrustCandidates);
    assert_eq!(
        result,
        Err(DetectionError::EmptyCorrespondenceSet("ghost".to_string()))
    );

    let mut sets = std::collections::BTreeMap::from([("ghost".to_string(), set)]);
    let spans = std::collections::HashMap::from([("ghost".to_string(), 0.5)]);
    let result = detect_objects(&mut sets, &[], &spans, &seeded_settings(), &TrustCandidates)
        .expect("other objects are unaffected");
    assert!(result.poses.is_empty());
    assert!(result.skipped.contains_key("ghost"));
}
