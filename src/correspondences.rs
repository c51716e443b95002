//! Correspondences between observed scene points and object model points.

use std::collections::BTreeMap;

use nalgebra::{Point2, Point3};

use crate::adjacency::{AdjacencyGraphs, AdjacencyParams};
use crate::error::DetectionError;
use crate::types::{DataMatrix, ObjectId, CORRESPONDENCE_COLS};
use crate::utils::{sort_unique, sorted_difference};

/// One observed 3D point matched to one 3D point of an object model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Point measured in the scene.
    pub query: Point3<f64>,
    /// Matching point on the object model.
    pub model: Point3<f64>,
    /// Identifier of the observed feature (keypoint index). May repeat.
    pub query_id: usize,
}

/// A model point matched to an observed keypoint, tagged with its object.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMatch {
    pub object_id: ObjectId,
    pub model: Point3<f64>,
}

/// All correspondences proposed for one candidate object, indexed `0..N`.
///
/// The set owns the shrinking pool of still-valid indices and the two
/// adjacency relations built over it.
#[derive(Debug, Clone)]
pub struct CorrespondenceSet {
    object_id: ObjectId,
    query_points: Vec<Point3<f64>>,
    model_points: Vec<Point3<f64>>,
    query_ids: Vec<usize>,
    valid_indices: Vec<usize>,
    graphs: AdjacencyGraphs,
}

impl CorrespondenceSet {
    /// Empty set for `object_id`.
    pub fn new(object_id: impl Into<ObjectId>) -> Self {
        Self {
            object_id: object_id.into(),
            query_points: Vec::new(),
            model_points: Vec::new(),
            query_ids: Vec::new(),
            valid_indices: Vec::new(),
            graphs: AdjacencyGraphs::default(),
        }
    }

    /// Build a set from a list of correspondences.
    pub fn from_correspondences(
        object_id: impl Into<ObjectId>,
        correspondences: impl IntoIterator<Item = Correspondence>,
    ) -> Self {
        let mut set = Self::new(object_id);
        for c in correspondences {
            set.push(c);
        }
        set
    }

    /// Append a correspondence; it receives the next dense index and starts valid.
    pub fn push(&mut self, correspondence: Correspondence) -> usize {
        let index = self.query_points.len();
        self.valid_indices.push(index);
        self.query_points.push(correspondence.query);
        self.model_points.push(correspondence.model);
        self.query_ids.push(correspondence.query_id);
        index
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Number of correspondences, valid or not.
    pub fn len(&self) -> usize {
        self.query_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.query_points.is_empty()
    }

    /// Correspondence at dense index `index`.
    pub fn get(&self, index: usize) -> Option<Correspondence> {
        Some(Correspondence {
            query: *self.query_points.get(index)?,
            model: self.model_points[index],
            query_id: self.query_ids[index],
        })
    }

    pub fn query_points(&self) -> &[Point3<f64>] {
        &self.query_points
    }

    pub fn model_points(&self) -> &[Point3<f64>] {
        &self.model_points
    }

    pub fn query_ids(&self) -> &[usize] {
        &self.query_ids
    }

    pub fn query_id(&self, index: usize) -> usize {
        self.query_ids[index]
    }

    /// Number of distinct observed features referenced by the set.
    pub fn distinct_query_ids(&self) -> usize {
        let mut ids = self.query_ids.clone();
        sort_unique(&mut ids);
        ids.len()
    }

    /// Sorted indices not yet consumed by an accepted pose.
    pub fn valid_indices(&self) -> &[usize] {
        &self.valid_indices
    }

    pub fn graphs(&self) -> &AdjacencyGraphs {
        &self.graphs
    }

    /// Pack the set into a `DataMatrix` (`[qx, qy, qz, mx, my, mz]` per row).
    pub fn data_matrix(&self) -> DataMatrix {
        let mut data = DataMatrix::zeros(self.len(), CORRESPONDENCE_COLS);
        for (row, (q, m)) in self
            .query_points
            .iter()
            .zip(self.model_points.iter())
            .enumerate()
        {
            for k in 0..3 {
                data[(row, k)] = q[k];
                data[(row, 3 + k)] = m[k];
            }
        }
        data
    }

    /// Rebuild both adjacency relations from scratch.
    ///
    /// `keypoints` holds the image position of every observed feature and is
    /// indexed by `query_id`.
    pub fn fill_adjacency(
        &mut self,
        keypoints: &[Point2<f64>],
        object_span: f64,
        sensor_error: f64,
        min_separation_px: f64,
    ) -> Result<(), DetectionError> {
        if self.is_empty() {
            return Err(DetectionError::EmptyCorrespondenceSet(
                self.object_id.clone(),
            ));
        }
        if !(sensor_error > 0.0) {
            return Err(DetectionError::NonPositiveSensorError(sensor_error));
        }
        if !(object_span > 0.0) {
            return Err(DetectionError::NonPositiveObjectSpan(object_span));
        }
        if let Some(index) = (0..self.len()).find(|&index| {
            !self.query_points[index]
                .coords
                .iter()
                .chain(self.model_points[index].coords.iter())
                .all(|c| c.is_finite())
        }) {
            return Err(DetectionError::NonFinitePoint { index });
        }

        let image_points = self
            .query_ids
            .iter()
            .map(|&query_id| {
                keypoints
                    .get(query_id)
                    .copied()
                    .ok_or(DetectionError::MissingKeypoint {
                        query_id,
                        keypoints: keypoints.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.graphs = AdjacencyGraphs::build(
            &self.query_points,
            &self.model_points,
            &image_points,
            AdjacencyParams {
                object_span,
                sensor_error,
                min_separation_px,
            },
        );
        Ok(())
    }

    /// Drop both adjacency relations once the object is processed.
    pub fn clear_adjacency(&mut self) {
        self.graphs.clear();
    }

    /// Permanently remove `indices` from the valid pool and from both relations.
    pub fn invalidate_indices(&mut self, indices: &[usize]) {
        let mut indices = indices.to_vec();
        sort_unique(&mut indices);
        self.valid_indices = sorted_difference(&self.valid_indices, &indices);
        self.graphs.invalidate(&indices);
    }

    /// Remove every valid correspondence whose observed feature is in `query_ids`.
    ///
    /// Returns the dense indices that were removed.
    pub fn invalidate_query_ids(&mut self, query_ids: &[usize]) -> Vec<usize> {
        if query_ids.is_empty() {
            return Vec::new();
        }
        let mut query_ids = query_ids.to_vec();
        sort_unique(&mut query_ids);

        let to_remove: Vec<usize> = self
            .valid_indices
            .iter()
            .copied()
            .filter(|&index| query_ids.binary_search(&self.query_ids[index]).is_ok())
            .collect();
        self.invalidate_indices(&to_remove);
        to_remove
    }
}

/// Group per-keypoint matches into one correspondence set per object.
///
/// `query_points[k]` is the 3D position of keypoint `k` and `matches[k]` the
/// model points it was matched to. Keypoints with a NaN coordinate have no
/// depth and are skipped.
pub fn group_by_object(
    query_points: &[Point3<f64>],
    matches: &[Vec<ModelMatch>],
) -> Result<BTreeMap<ObjectId, CorrespondenceSet>, DetectionError> {
    if query_points.len() != matches.len() {
        return Err(DetectionError::LengthMismatch {
            what: "matches",
            expected: query_points.len(),
            got: matches.len(),
        });
    }

    let mut sets: BTreeMap<ObjectId, CorrespondenceSet> = BTreeMap::new();
    for (query_id, (query, local_matches)) in query_points.iter().zip(matches).enumerate() {
        if query.iter().any(|c| c.is_nan()) {
            continue;
        }
        for m in local_matches {
            sets.entry(m.object_id.clone())
                .or_insert_with(|| CorrespondenceSet::new(m.object_id.clone()))
                .push(Correspondence {
                    query: *query,
                    model: m.model,
                    query_id,
                });
        }
    }
    Ok(sets)
}
