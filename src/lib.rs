//! # adjacency-ransac - multi-instance rigid pose recovery
//!
//! `adjacency_ransac` recovers the rigid poses of one or more instances of
//! known objects from heavily contaminated 3D-to-3D correspondences (observed
//! scene point ↔ object model point).
//!
//! The search is a RANSAC variant constrained by two adjacency relations
//! built over the correspondences of each object:
//!
//! - minimal samples are drawn only among pairwise *sample-adjacent*
//!   correspondences (distance-consistent and well separated in the image);
//! - a correspondence only counts as an inlier if it is *physically adjacent*
//!   to every member of the sample, and the inlier set must contain a large
//!   enough clique, as reported by a pluggable [`CliqueOracle`];
//! - the best hypothesis is grown by alternating least-squares refits and
//!   re-admission of points within the threshold;
//! - accepted instances consume their observed points and the search repeats.
//!
//! ## Quick Start
//!
//! ```rust
//! use adjacency_ransac::{
//!     extract_instances, Correspondence, CorrespondenceSet, DetectionSettings, TrustCandidates,
//! };
//! use nalgebra::{Point2, Point3};
//!
//! // Twenty observed points on a 5x4 grid, matched to a model shifted by 1m along z.
//! let mut set = CorrespondenceSet::new("box");
//! let mut keypoints = Vec::new();
//! for k in 0..20 {
//!     let query = Point3::new((k % 5) as f64 * 0.03, (k / 5) as f64 * 0.03, 1.0 + (k % 3) as f64 * 0.02);
//!     set.push(Correspondence { query, model: query - nalgebra::Vector3::z(), query_id: k });
//!     keypoints.push(Point2::new((k % 5) as f64 * 30.0, (k / 5) as f64 * 30.0));
//! }
//!
//! let settings = DetectionSettings { seed: Some(1), ..DetectionSettings::default() };
//! let report = extract_instances(&mut set, &keypoints, 0.3, &settings, &TrustCandidates).unwrap();
//! assert_eq!(report.poses.len(), 1);
//! assert_eq!(report.poses[0].inliers.len(), 20);
//! ```
//!
//! ## Extending the Library
//!
//! The consensus loop in [`core`] is generic over the traits
//! [`Estimator`](core::Estimator), [`Sampler`](core::Sampler),
//! [`Scoring<M>`](core::Scoring), [`TerminationCriterion<S>`](core::TerminationCriterion)
//! and [`LocalOptimizer<M, S>`](optimisers::LocalOptimizer). The maximum-clique
//! search is injected through [`CliqueOracle`], which is implemented for any
//! `Fn(&CliqueGraph, usize) -> Option<Vec<NodeIndex>>`.

pub mod adjacency;
pub mod api;
pub mod clique;
pub mod core;
pub mod correspondences;
pub mod detector;
pub mod error;
pub mod estimators;
pub mod models;
pub mod optimisers;
pub mod samplers;
pub mod scoring;
pub mod settings;
pub mod types;
pub mod utils;

pub use adjacency::{AdjacencyGraphs, AdjacencyMatrix};
pub use api::{detect_from_matches, detect_objects, DetectionResult};
pub use clique::{CliqueGraph, CliqueOracle, TrustCandidates};
pub use correspondences::{group_by_object, Correspondence, CorrespondenceSet, ModelMatch};
pub use detector::{extract_instances, find_pose, ExtractionReport, StopReason};
pub use error::DetectionError;
pub use models::{PoseHypothesis, RigidTransform};
pub use settings::DetectionSettings;
pub use types::{DataMatrix, ObjectId};
