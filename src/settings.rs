//! Detection configuration.
//!
//! Distances are in the unit of the input points (meters for depth sensors),
//! separations in pixels. The defaults are the ones the detector was tuned
//! with on Kinect-class depth data.

use serde::{Deserialize, Serialize};

use crate::error::DetectionError;

/// Settings for the consensus loop, inlier growth and instance extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Minimum number of inliers for a pose to be accepted.
    pub min_inliers: usize,
    /// Maximum number of RANSAC iterations per pose.
    pub n_ransac_iterations: usize,
    /// Maximum expected 3D measurement error. Also the inlier distance threshold.
    pub sensor_error: f64,
    /// Desired confidence in \[0, 1\) used to shrink the iteration budget.
    pub confidence: f64,
    /// Number of correspondences in a minimal sample.
    pub sample_size: usize,
    /// Minimum number of sample-adjacent neighbors for a correspondence to seed samples.
    pub min_sample_connectivity: usize,
    /// Minimum clique size the validation oracle must find among candidate inliers.
    pub min_clique_size: usize,
    /// Minimum image distance between two keypoints drawn in the same sample.
    pub min_sample_separation_px: f64,
    /// Factor applied to the squared growth threshold for the final growth pass.
    pub growth_loosening: f64,
    /// Sampling attempts per RANSAC iteration before the iteration is skipped.
    pub max_sample_attempts: usize,
    /// Fixed random seed. `None` seeds from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            min_inliers: 15,
            n_ransac_iterations: 1000,
            sensor_error: 0.01,
            confidence: 0.99,
            sample_size: 3,
            min_sample_connectivity: 3,
            min_clique_size: 8,
            min_sample_separation_px: 20.0,
            growth_loosening: 4.0,
            max_sample_attempts: 100,
            seed: None,
        }
    }
}

impl DetectionSettings {
    /// Check that the settings describe a runnable configuration.
    pub fn validate(&self) -> Result<(), DetectionError> {
        if !(self.sensor_error > 0.0) {
            return Err(DetectionError::NonPositiveSensorError(self.sensor_error));
        }
        if self.sample_size < 3 {
            return Err(DetectionError::InvalidSettings(format!(
                "sample_size must be at least 3, got {}",
                self.sample_size
            )));
        }
        if self.n_ransac_iterations == 0 {
            return Err(DetectionError::InvalidSettings(
                "n_ransac_iterations must be positive".to_string(),
            ));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(DetectionError::InvalidSettings(format!(
                "confidence must lie in (0, 1), got {}",
                self.confidence
            )));
        }
        if !(self.growth_loosening >= 1.0) {
            return Err(DetectionError::InvalidSettings(format!(
                "growth_loosening must be at least 1, got {}",
                self.growth_loosening
            )));
        }
        if self.max_sample_attempts == 0 {
            return Err(DetectionError::InvalidSettings(
                "max_sample_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Squared inlier threshold used by the consensus loop and the first growth passes.
    pub fn squared_threshold(&self) -> f64 {
        self.sensor_error * self.sensor_error
    }
}
