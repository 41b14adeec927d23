//! Brute-force search: every query against every reference

use crate::core::{Dataset, Result, SearchStats};
use crate::kernel::Kernel;
use crate::search::{assemble, evaluate, validate, CandidateSet, SearchResults};
use log::debug;
use rayon::prelude::*;

/// Score every (query, reference) pair and keep the best `k` per query
pub fn search<K: Kernel + ?Sized>(
    kernel: &K,
    queries: &Dataset,
    references: &Dataset,
    k: usize,
    parallel: bool,
) -> Result<SearchResults> {
    validate(queries, references, k)?;

    let score_query = |q: usize| -> Result<CandidateSet> {
        let mut set = CandidateSet::new(k);
        for r in 0..references.len() {
            set.insert(r, evaluate(kernel, queries, references, q, r)?);
        }
        Ok(set)
    };

    let sets: Vec<CandidateSet> = if parallel {
        (0..queries.len())
            .into_par_iter()
            .map(&score_query)
            .collect::<Result<_>>()?
    } else {
        (0..queries.len()).map(&score_query).collect::<Result<_>>()?
    };

    let stats = SearchStats {
        base_cases: (queries.len() * references.len()) as u64,
        ..SearchStats::default()
    };
    debug!(
        "Naive search: {} queries x {} references",
        queries.len(),
        references.len()
    );

    let (indices, kernels) = assemble(sets, k)?;
    Ok(SearchResults {
        indices,
        kernels,
        stats,
    })
}
