//! Precondition errors.
//!
//! "Found nothing" outcomes are not errors: they are reported through
//! [`StopReason`](crate::detector::StopReason) and `Option` results.

/// Input rejected before any sampling takes place.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("correspondence set for object `{0}` is empty")]
    EmptyCorrespondenceSet(String),

    #[error("sensor error must be positive, got {0}")]
    NonPositiveSensorError(f64),

    #[error("object span must be positive, got {0}")]
    NonPositiveObjectSpan(f64),

    #[error("{what} has {got} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("observed point {query_id} has no keypoint (only {keypoints} keypoints given)")]
    MissingKeypoint { query_id: usize, keypoints: usize },

    #[error("correspondence {index} has a non-finite coordinate")]
    NonFinitePoint { index: usize },

    #[error("no object span given for object `{0}`")]
    MissingObjectSpan(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}
