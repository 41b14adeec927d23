//! Conversion of per-query candidate sets into output tables

use crate::core::{FastMksError, Result, Table};
use crate::search::CandidateSet;

/// Sort every set best first and lay the results out as k x q tables
///
/// `sets[i]` holds the candidates of query `i`. Fails with `InvalidArgument`
/// if any set holds fewer than `k` candidates.
pub fn assemble(sets: Vec<CandidateSet>, k: usize) -> Result<(Table<usize>, Table<f64>)> {
    let n_queries = sets.len();
    let mut indices = Vec::with_capacity(k * n_queries);
    let mut kernels = Vec::with_capacity(k * n_queries);

    for (query, set) in sets.into_iter().enumerate() {
        if set.len() < k {
            return Err(FastMksError::InvalidArgument(format!(
                "Query {query} has {} results, expected {k}",
                set.len()
            )));
        }
        for candidate in set.into_sorted_vec().into_iter().take(k) {
            indices.push(candidate.index);
            kernels.push(candidate.kernel);
        }
    }

    Ok((
        Table::from_columns(k, n_queries, indices)?,
        Table::from_columns(k, n_queries, kernels)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_orders_columns() {
        let mut first = CandidateSet::new(2);
        first.insert(3, 1.0);
        first.insert(1, 4.0);
        first.insert(2, 1.0);
        let mut second = CandidateSet::new(2);
        second.insert(0, -1.0);
        second.insert(5, -1.0);

        let (indices, kernels) = assemble(vec![first, second], 2).unwrap();
        assert_eq!(indices.n_rows(), 2);
        assert_eq!(indices.n_cols(), 2);
        assert_eq!(indices.column(0), &[1, 2]);
        assert_eq!(kernels.column(0), &[4.0, 1.0]);
        assert_eq!(indices.column(1), &[0, 5]);
        assert_eq!(kernels.column(1), &[-1.0, -1.0]);
    }

    #[test]
    fn test_assemble_rejects_short_set() {
        let mut set = CandidateSet::new(3);
        set.insert(0, 1.0);
        assert!(matches!(
            assemble(vec![set], 3),
            Err(FastMksError::InvalidArgument(_))
        ));
    }
}
