//! Estimators for geometric models.
//!
//! Only rigid motions are needed here: one closed-form fit serves both the
//! minimal samples of the consensus loop and the least-squares refits of the
//! inlier growth.

pub mod rigid_transform;

pub use rigid_transform::RigidTransformEstimator;
