//! Core shared types.
//!
//! Correspondences are packed into a dense `DataMatrix` so that estimators and
//! scoring work on plain row indices, the same way the sample-consensus loop
//! addresses them.

use nalgebra::DMatrix;

/// Dynamic matrix of `f64` with one row per correspondence.
///
/// Columns `0..3` hold the observed (query) point, columns `3..6` the model
/// (training) point.
pub type DataMatrix = DMatrix<f64>;

/// Number of columns of a correspondence [`DataMatrix`].
pub const CORRESPONDENCE_COLS: usize = 6;

/// Identifier of an object in the caller's object database.
pub type ObjectId = String;
