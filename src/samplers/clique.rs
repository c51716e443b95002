//! Sampler drawing minimal samples that form a clique in sample adjacency.

use crate::adjacency::AdjacencyMatrix;
use crate::core::Sampler;
use crate::types::DataMatrix;
use crate::utils::{sorted_intersection, UniformRandomGenerator};

/// Result of a successful clique draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliqueDraw {
    /// Selected indices in draw order; pairwise adjacent.
    pub sample: Vec<usize>,
    /// The input pool minus the candidates proven unable to start a clique.
    pub pool: Vec<usize>,
}

/// Draw `size` pairwise adjacent indices from the sorted `pool`.
///
/// Randomized backtracking: pick a candidate uniformly, recurse on its
/// neighbors within the pool, and drop the candidate if the recursion fails.
/// Returns `None` once the pool is empty, i.e. when no `size`-clique exists
/// in the subgraph induced by `pool`.
pub fn draw_clique(
    rng: &mut UniformRandomGenerator,
    pool: &[usize],
    adjacency: &AdjacencyMatrix,
    size: usize,
) -> Option<CliqueDraw> {
    let mut pool = pool.to_vec();
    if size == 0 {
        return Some(CliqueDraw {
            sample: Vec::new(),
            pool,
        });
    }

    while !pool.is_empty() {
        let pos = rng.index(pool.len());
        let candidate = pool[pos];

        let narrowed = sorted_intersection(adjacency.neighbors(candidate), &pool);
        if narrowed.len() + 1 >= size {
            if let Some(inner) = draw_clique(rng, &narrowed, adjacency, size - 1) {
                let mut sample = Vec::with_capacity(size);
                sample.push(candidate);
                sample.extend(inner.sample);
                return Some(CliqueDraw { sample, pool });
            }
        }

        pool.remove(pos);
    }

    None
}

/// [`Sampler`] over a fixed pool of seed indices.
///
/// Candidates that provably cannot start a clique are dropped from the pool
/// as they are discovered, so repeated draws get cheaper. Once a draw fails
/// the pool is empty and the sampler reports itself exhausted.
pub struct CliqueSampler<'a> {
    adjacency: &'a AdjacencyMatrix,
    pool: Vec<usize>,
    rng: &'a mut UniformRandomGenerator,
    exhausted: bool,
}

impl<'a> CliqueSampler<'a> {
    /// `pool` must be sorted.
    pub fn new(
        adjacency: &'a AdjacencyMatrix,
        pool: Vec<usize>,
        rng: &'a mut UniformRandomGenerator,
    ) -> Self {
        Self {
            adjacency,
            exhausted: pool.is_empty(),
            pool,
            rng,
        }
    }

    /// Remaining seed candidates.
    pub fn pool(&self) -> &[usize] {
        &self.pool
    }
}

impl Sampler for CliqueSampler<'_> {
    fn sample(&mut self, _data: &DataMatrix, sample_size: usize, out_indices: &mut [usize]) -> bool {
        if self.exhausted || out_indices.len() < sample_size {
            return false;
        }

        match draw_clique(&mut *self.rng, &self.pool, self.adjacency, sample_size) {
            Some(draw) => {
                out_indices[..sample_size].copy_from_slice(&draw.sample);
                self.pool = draw.pool;
                true
            }
            None => {
                self.pool.clear();
                self.exhausted = true;
                false
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
