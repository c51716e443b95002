use crate::types::DataMatrix;

/// Optimization step applied to the best hypothesis of a consensus run.
///
/// It receives the current model and its inliers and returns a possibly
/// refined model, score and inlier set.
///
/// ## Example: custom refinement
///
/// ```rust
/// use adjacency_ransac::optimisers::LocalOptimizer;
/// use adjacency_ransac::types::DataMatrix;
///
/// #[derive(Clone)]
/// struct Offset(f64);
///
/// struct KeepInliers;
///
/// impl LocalOptimizer<Offset, usize> for KeepInliers {
///     fn run(
///         &mut self,
///         _data: &DataMatrix,
///         inliers: &[usize],
///         model: &Offset,
///         _score: &usize,
///     ) -> (Offset, usize, Vec<usize>) {
///         (model.clone(), inliers.len(), inliers.to_vec())
///     }
/// }
///
/// let data = DataMatrix::zeros(3, 6);
/// let (_, score, inliers) = KeepInliers.run(&data, &[0, 2], &Offset(1.0), &0);
/// assert_eq!(score, 2);
/// assert_eq!(inliers, vec![0, 2]);
/// ```
pub trait LocalOptimizer<M, S: Clone> {
    /// Run the optimization on the current model and inliers.
    fn run(
        &mut self,
        data: &DataMatrix,
        inliers: &[usize],
        model: &M,
        best_score: &S,
    ) -> (M, S, Vec<usize>);
}

/// Optimizer used when no refinement is desired.
pub struct NoopLocalOptimizer;

impl<M: Clone, S: Clone> LocalOptimizer<M, S> for NoopLocalOptimizer {
    fn run(
        &mut self,
        _data: &DataMatrix,
        inliers: &[usize],
        model: &M,
        best_score: &S,
    ) -> (M, S, Vec<usize>) {
        (model.clone(), best_score.clone(), inliers.to_vec())
    }
}

pub mod growth;

pub use growth::InlierGrowthOptimizer;
