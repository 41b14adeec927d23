//! Max-kernel search traversals
//!
//! Three strategies produce the same top-k tables: `naive` scores every pair,
//! `single` descends a reference tree once per query and `dual` descends a
//! query tree and a reference tree together.

pub mod assemble;
pub mod candidates;
pub mod dual;
pub mod naive;
pub mod single;

pub use self::assemble::assemble;
pub use self::candidates::{Candidate, CandidateSet};

use crate::core::{Dataset, FastMksError, Result, SearchStats, Table};
use crate::kernel::Kernel;
use serde::{Deserialize, Serialize};

/// Top-k answers for a batch of queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Reference indices, k rows by one column per query
    pub indices: Table<usize>,
    /// Kernel values matching `indices`
    pub kernels: Table<f64>,
    /// Work performed by the traversal
    pub stats: SearchStats,
}

impl SearchResults {
    /// Number of results per query
    pub fn k(&self) -> usize {
        self.indices.n_rows()
    }

    /// Number of queries answered
    pub fn n_queries(&self) -> usize {
        self.indices.n_cols()
    }

    /// (reference index, kernel value) pairs of one query, best first
    pub fn neighbors(&self, query: usize) -> Vec<(usize, f64)> {
        self.indices
            .column(query)
            .iter()
            .copied()
            .zip(self.kernels.column(query).iter().copied())
            .collect()
    }
}

/// Check the arguments shared by every traversal
pub(crate) fn validate(queries: &Dataset, references: &Dataset, k: usize) -> Result<()> {
    if queries.dim() != references.dim() {
        return Err(FastMksError::dimension_mismatch(
            references.dim(),
            queries.dim(),
        ));
    }
    if k == 0 || k > references.len() {
        return Err(FastMksError::InvalidArgument(format!(
            "k must be between 1 and the number of reference points ({}), got {k}",
            references.len()
        )));
    }
    queries.check_finite()?;
    references.check_finite()
}

/// Evaluate K(query, reference), failing on a non-finite value
pub(crate) fn evaluate<K: Kernel + ?Sized>(
    kernel: &K,
    queries: &Dataset,
    references: &Dataset,
    q: usize,
    r: usize,
) -> Result<f64> {
    checked(kernel.compute(queries.point(q), references.point(r)), q, r)
}

pub(crate) fn checked(value: f64, q: usize, r: usize) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FastMksError::NumericalError(format!(
            "Kernel between query {q} and reference {r} is {value}"
        )))
    }
}

/// Whether a child scored `(bound, center_kernel)` is explored before `other`
///
/// Bounds of nodes spanning several far apart groups all clamp to the same
/// norm product, so equal bounds fall back to the kernel value at the centers.
pub(crate) fn explore_first(child: (f64, f64), other: (f64, f64)) -> bool {
    child.0 > other.0 || (child.0 == other.0 && child.1 > other.1)
}
