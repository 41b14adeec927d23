//! Single-tree search: each query descends the reference tree on its own

use crate::core::{Dataset, FastMksError, Result, SearchStats};
use crate::kernel::Kernel;
use crate::search::{assemble, evaluate, explore_first, validate, CandidateSet, SearchResults};
use crate::tree::bound::point_node_bound;
use crate::tree::{self_kernels, KernelTree};
use log::debug;
use rayon::prelude::*;

/// Pending node visit: node id, its bound and K(query, node center)
struct Visit {
    node: usize,
    bound: f64,
    center_kernel: f64,
}

/// Search every query against a prebuilt reference tree
///
/// `tree` must have been built over `references` with the same kernel.
pub fn search<K: Kernel + ?Sized>(
    kernel: &K,
    queries: &Dataset,
    tree: &KernelTree,
    references: &Dataset,
    k: usize,
    parallel: bool,
) -> Result<SearchResults> {
    validate(queries, references, k)?;
    if tree.len() != references.len() {
        return Err(FastMksError::InvalidArgument(format!(
            "Tree indexes {} points but the reference set has {}",
            tree.len(),
            references.len()
        )));
    }

    let query_norms: Vec<f64> = self_kernels(queries, kernel)?
        .into_iter()
        .map(|value| value.max(0.0).sqrt())
        .collect();

    let search_query = |q: usize| -> Result<(CandidateSet, SearchStats)> {
        let mut searcher = QuerySearch {
            kernel,
            queries,
            references,
            tree,
            query: q,
            query_norm: query_norms[q],
            set: CandidateSet::new(k),
            stats: SearchStats::default(),
        };
        searcher.run()?;
        Ok((searcher.set, searcher.stats))
    };

    let outcomes: Vec<(CandidateSet, SearchStats)> = if parallel {
        (0..queries.len())
            .into_par_iter()
            .map(&search_query)
            .collect::<Result<_>>()?
    } else {
        (0..queries.len()).map(&search_query).collect::<Result<_>>()?
    };

    let mut stats = SearchStats::default();
    let mut sets = Vec::with_capacity(outcomes.len());
    for (set, query_stats) in outcomes {
        stats.merge(&query_stats);
        sets.push(set);
    }
    debug!(
        "Single-tree search: {} queries, {} base cases, {} scores, {} prunes",
        queries.len(),
        stats.base_cases,
        stats.scores,
        stats.prunes
    );

    let (indices, kernels) = assemble(sets, k)?;
    Ok(SearchResults {
        indices,
        kernels,
        stats,
    })
}

struct QuerySearch<'a, K: Kernel + ?Sized> {
    kernel: &'a K,
    queries: &'a Dataset,
    references: &'a Dataset,
    tree: &'a KernelTree,
    query: usize,
    query_norm: f64,
    set: CandidateSet,
    stats: SearchStats,
}

impl<'a, K: Kernel + ?Sized> QuerySearch<'a, K> {
    fn center_kernel(&mut self, node: usize) -> Result<f64> {
        self.stats.scores += 1;
        let center = self.tree.node(node).center;
        evaluate(self.kernel, self.queries, self.references, self.query, center)
    }

    fn visit(&self, node: usize, center_kernel: f64) -> Visit {
        Visit {
            node,
            bound: point_node_bound(center_kernel, self.query_norm, self.tree.node(node)),
            center_kernel,
        }
    }

    fn run(&mut self) -> Result<()> {
        let tree = self.tree;
        let root_kernel = self.center_kernel(0)?;
        let mut stack = vec![self.visit(0, root_kernel)];

        while let Some(visit) = stack.pop() {
            let node = tree.node(visit.node);
            if !self.set.admits(visit.bound, node.min_index) {
                self.stats.prunes += 1;
                continue;
            }

            match node.children {
                None => {
                    for &r in tree.points(node) {
                        let value =
                            evaluate(self.kernel, self.queries, self.references, self.query, r)?;
                        self.set.insert(r, value);
                    }
                    self.stats.base_cases += node.count as u64;
                }
                Some((left, right)) => {
                    // The left child keeps the parent's center
                    self.stats.scores += 1;
                    let left = self.visit(left, visit.center_kernel);
                    let right_kernel = self.center_kernel(right)?;
                    let right = self.visit(right, right_kernel);

                    // Higher bound on top of the stack, then the closer center
                    let (first, second) = if explore_first(
                        (right.bound, right.center_kernel),
                        (left.bound, left.center_kernel),
                    ) {
                        (right, left)
                    } else {
                        (left, right)
                    };
                    for child in [second, first] {
                        if self.set.admits(child.bound, tree.node(child.node).min_index) {
                            stack.push(child);
                        } else {
                            self.stats.prunes += 1;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{GaussianKernel, LinearKernel, PolynomialKernel};
    use crate::search::naive;

    /// Four tight groups of 20 points at x = 0, 36, 12 and 24, in that order
    fn line_groups() -> Dataset {
        let rows = [0.0, 36.0, 12.0, 24.0]
            .iter()
            .flat_map(|&x| {
                (0..20).map(move |i| vec![x + 0.01 * (i % 5) as f64, 0.01 * (i / 5) as f64])
            })
            .collect();
        Dataset::from_rows(rows).unwrap()
    }

    fn spiral(n: usize) -> Dataset {
        let rows = (0..n)
            .map(|i| {
                let t = i as f64 * 0.21;
                vec![t.cos() * (1.0 + t * 0.1), t.sin() * (1.0 + t * 0.1), (t * 0.7).sin()]
            })
            .collect();
        Dataset::from_rows(rows).unwrap()
    }

    #[test]
    fn test_single_matches_naive() {
        let data = spiral(300);
        let kernel = PolynomialKernel::with_offset(2, 1.0);
        let tree = KernelTree::build(&data, &kernel, 8).unwrap();

        let single = search(&kernel, &data, &tree, &data, 7, false).unwrap();
        let naive = naive::search(&kernel, &data, &data, 7, false).unwrap();
        assert_eq!(single.indices, naive.indices);
        assert!(single.stats.base_cases < naive.stats.base_cases);
    }

    #[test]
    fn test_single_k_equals_n() {
        let data = spiral(25);
        let kernel = LinearKernel::new();
        let tree = KernelTree::build(&data, &kernel, 3).unwrap();
        let results = search(&kernel, &data, &tree, &data, 25, true).unwrap();

        let mut column = results.indices.column(4).to_vec();
        column.sort_unstable();
        assert_eq!(column, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_rejects_foreign_tree() {
        let data = spiral(30);
        let other = spiral(10);
        let kernel = LinearKernel::new();
        let tree = KernelTree::build(&other, &kernel, 3).unwrap();
        assert!(matches!(
            search(&kernel, &data, &tree, &data, 1, false),
            Err(FastMksError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_single_stays_in_own_group() {
        // Nodes spanning several groups share the same clamped bound; each
        // query must still reach its own group first and skip the others
        let data = line_groups();
        let kernel = GaussianKernel::from_bandwidth(1.0);
        let tree = KernelTree::build(&data, &kernel, 5).unwrap();

        let results = search(&kernel, &data, &tree, &data, 3, false).unwrap();
        assert!(results.stats.base_cases <= 80 * 20);
        for query in 0..80 {
            assert!(results.indices.column(query).iter().all(|&r| r / 20 == query / 20));
        }

        let naive = naive::search(&kernel, &data, &data, 3, false).unwrap();
        assert_eq!(results.indices, naive.indices);
    }
}
