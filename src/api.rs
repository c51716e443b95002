//! High-level detection API.
//!
//! These functions run the extraction loop for every candidate object of a
//! frame. Objects are independent: an object whose input is rejected is
//! logged and skipped, the others are still processed.

use std::collections::{BTreeMap, HashMap};

use nalgebra::{Point2, Point3};

use crate::clique::CliqueOracle;
use crate::correspondences::{group_by_object, CorrespondenceSet, ModelMatch};
use crate::detector::{extract_instances, StopReason};
use crate::error::DetectionError;
use crate::models::PoseHypothesis;
use crate::settings::DetectionSettings;
use crate::types::ObjectId;

/// Result of detecting all candidate objects of one frame.
#[derive(Debug, Clone, Default)]
pub struct DetectionResult {
    /// Accepted poses of every object, grouped by object in id order.
    pub poses: Vec<PoseHypothesis>,
    /// Why extraction stopped, per processed object.
    pub stops: BTreeMap<ObjectId, StopReason>,
    /// Objects skipped because their input was rejected.
    pub skipped: BTreeMap<ObjectId, DetectionError>,
}

/// Detect every instance of every object in `sets`.
///
/// # Arguments
/// * `sets` - One correspondence set per candidate object
/// * `keypoints` - Image positions of the observed points, indexed by observed-point id
/// * `spans` - Characteristic diameter of each object
/// * `settings` - Detection settings shared by all objects
/// * `oracle` - Maximum-clique search used to validate inlier sets
pub fn detect_objects<O: CliqueOracle + ?Sized>(
    sets: &mut BTreeMap<ObjectId, CorrespondenceSet>,
    keypoints: &[Point2<f64>],
    spans: &HashMap<ObjectId, f64>,
    settings: &DetectionSettings,
    oracle: &O,
) -> Result<DetectionResult, DetectionError> {
    settings.validate()?;

    let mut result = DetectionResult::default();
    for (object_id, set) in sets.iter_mut() {
        let report = spans
            .get(object_id)
            .ok_or_else(|| DetectionError::MissingObjectSpan(object_id.clone()))
            .and_then(|&span| extract_instances(set, keypoints, span, settings, oracle));

        match report {
            Ok(report) => {
                result.poses.extend(report.poses);
                result.stops.insert(object_id.clone(), report.stop);
            }
            Err(err) => {
                log::warn!("skipping object {}: {}", object_id, err);
                result.skipped.insert(object_id.clone(), err);
            }
        }
    }

    log::info!(
        "detected {} poses over {} objects ({} skipped)",
        result.poses.len(),
        result.stops.len(),
        result.skipped.len()
    );
    Ok(result)
}

/// Group per-keypoint matches by object and detect every instance.
///
/// `query_points[k]` and `keypoints[k]` are the 3D and image positions of
/// observed point `k`, and `matches[k]` the model points it was matched to.
/// Observed points without depth (NaN coordinates) are ignored.
pub fn detect_from_matches<O: CliqueOracle + ?Sized>(
    query_points: &[Point3<f64>],
    keypoints: &[Point2<f64>],
    matches: &[Vec<ModelMatch>],
    spans: &HashMap<ObjectId, f64>,
    settings: &DetectionSettings,
    oracle: &O,
) -> Result<DetectionResult, DetectionError> {
    if keypoints.len() != query_points.len() {
        return Err(DetectionError::LengthMismatch {
            what: "keypoints",
            expected: query_points.len(),
            got: keypoints.len(),
        });
    }
    let mut sets = group_by_object(query_points, matches)?;
    detect_objects(&mut sets, keypoints, spans, settings, oracle)
}
