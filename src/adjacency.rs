//! Sparse adjacency relations between correspondences.
//!
//! Two relations are built per correspondence set:
//! - *physical* adjacency: the two correspondences keep their pairwise distance
//!   under a rigid motion (up to sensor noise) and may belong to one instance;
//! - *sample* adjacency: physically adjacent pairs that are additionally far
//!   apart in the image and tightly distance-consistent, safe to co-select in
//!   a minimal sample.
//!
//! Sample adjacency is always a subset of physical adjacency.

use nalgebra::{Point2, Point3};

use crate::utils::{sorted_difference, sorted_intersection};

/// Symmetric boolean relation stored as a sorted neighbor list per vertex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyMatrix {
    neighbors: Vec<Vec<usize>>,
}

impl AdjacencyMatrix {
    /// Matrix over `n` vertices with no edges.
    pub fn new(n: usize) -> Self {
        Self {
            neighbors: vec![Vec::new(); n],
        }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Drop all vertices and edges.
    pub fn clear(&mut self) {
        self.neighbors.clear();
    }

    /// Whether `i` and `j` are adjacent.
    pub fn test(&self, i: usize, j: usize) -> bool {
        self.neighbors
            .get(i)
            .is_some_and(|n| n.binary_search(&j).is_ok())
    }

    /// Add the edge `(i, j)`, keeping both neighbor lists sorted.
    pub fn set_sorted(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        for (a, b) in [(i, j), (j, i)] {
            let list = &mut self.neighbors[a];
            if let Err(pos) = list.binary_search(&b) {
                list.insert(pos, b);
            }
        }
    }

    /// Sorted neighbors of `i`; empty for unknown vertices.
    pub fn neighbors(&self, i: usize) -> &[usize] {
        self.neighbors.get(i).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Remove every edge touching one of `indices` (sorted, unique).
    ///
    /// Only the neighbor lists of vertices adjacent to the cluster are
    /// rewritten, so the cost is linear in the number of affected edges.
    pub fn invalidate_cluster(&mut self, indices: &[usize]) {
        let mut touched = Vec::new();
        for &r in indices {
            if let Some(list) = self.neighbors.get_mut(r) {
                touched.append(list);
            }
        }
        crate::utils::sort_unique(&mut touched);
        let touched = sorted_difference(&touched, indices);

        for v in touched {
            let kept = sorted_difference(&self.neighbors[v], indices);
            self.neighbors[v] = kept;
        }
    }

    /// Vertices of `valid` (sorted) with at least `min_neighbors` neighbors.
    pub fn sample_pool(&self, valid: &[usize], min_neighbors: usize) -> Vec<usize> {
        let connected: Vec<usize> = (0..self.len())
            .filter(|&i| self.neighbors[i].len() >= min_neighbors)
            .collect();
        sorted_intersection(&connected, valid)
    }
}

/// Geometric tolerances for building the two relations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjacencyParams {
    /// Characteristic diameter of the object.
    pub object_span: f64,
    /// Maximum expected 3D measurement error.
    pub sensor_error: f64,
    /// Minimum image distance for sample adjacency.
    pub min_separation_px: f64,
}

/// Physical and sample adjacency of one correspondence set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyGraphs {
    pub physical: AdjacencyMatrix,
    pub sample: AdjacencyMatrix,
}

impl AdjacencyGraphs {
    /// Build both relations with an O(N²) scan over all pairs.
    ///
    /// `query_points[i]`, `model_points[i]` and `image_points[i]` describe
    /// correspondence `i`; the three slices must have the same length.
    pub fn build(
        query_points: &[Point3<f64>],
        model_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        params: AdjacencyParams,
    ) -> Self {
        let n = query_points.len();
        debug_assert_eq!(model_points.len(), n);
        debug_assert_eq!(image_points.len(), n);

        let mut physical = AdjacencyMatrix::new(n);
        let mut sample = AdjacencyMatrix::new(n);

        let error = params.sensor_error;
        let max_query_dist = params.object_span + 2.0 * error;
        let max_query_dist_sq = max_query_dist * max_query_dist;
        let min_separation_sq = params.min_separation_px * params.min_separation_px;

        for i in 0..n {
            for j in (i + 1)..n {
                // Pairs with the same observed point are kept: training data
                // can hold two noisy copies of one feature.
                // Negated tests so that a NaN distance never links two points.
                let dist_query_sq = (query_points[i] - query_points[j]).norm_squared();
                if !(dist_query_sq <= max_query_dist_sq) {
                    continue;
                }
                let dist_query = dist_query_sq.sqrt();
                let dist_model = (model_points[i] - model_points[j]).norm();
                let discrepancy = (dist_model - dist_query).abs();
                if !(discrepancy <= 4.0 * error) {
                    continue;
                }

                physical.set_sorted(i, j);

                let separation_sq = (image_points[i] - image_points[j]).norm_squared();
                if separation_sq > min_separation_sq && discrepancy < 2.0 * error {
                    sample.set_sorted(i, j);
                }
            }
        }

        log::debug!(
            "adjacency over {} correspondences: {} physical edges, {} sample edges",
            n,
            physical.edge_count(),
            sample.edge_count()
        );

        Self { physical, sample }
    }

    /// Remove the given indices (sorted, unique) from both relations.
    pub fn invalidate(&mut self, indices: &[usize]) {
        self.physical.invalidate_cluster(indices);
        self.sample.invalidate_cluster(indices);
    }

    pub fn clear(&mut self) {
        self.physical.clear();
        self.sample.clear();
    }
}
