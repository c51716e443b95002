//! Sampling strategies.
//!
//! Minimal samples are drawn only among correspondences that are mutually
//! sample-adjacent, so every sample handed to the estimator is already
//! combinatorially consistent.

pub mod clique;

pub use clique::{draw_clique, CliqueDraw, CliqueSampler};
