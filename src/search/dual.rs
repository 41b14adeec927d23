//! Dual-tree search: a query tree and a reference tree descended together
//!
//! Every query node carries an aggregate threshold, the worst of its points'
//! kth best candidates (`None` while any of them has fewer than k). A node pair
//! is pruned when its bound cannot beat that threshold. The query tree is cut
//! into disjoint subtrees, one task each; a task owns the candidate sets of
//! its subtree's points (a contiguous slice, since sets are stored in tree
//! order) and the aggregates of its subtree's nodes (contiguous ids).

use crate::cache::{CacheStats, KernelCache, DEFAULT_CACHE_CAPACITY};
use crate::core::{Dataset, FastMksError, Result, SearchStats};
use crate::kernel::Kernel;
use crate::search::candidates::{admits, looser, Candidate};
use crate::search::{
    assemble, checked, evaluate, explore_first, validate, CandidateSet, SearchResults,
};
use crate::tree::bound::node_node_bound;
use crate::tree::KernelTree;
use log::debug;
use rayon::prelude::*;

/// Query subtrees handed out per worker thread
const TASKS_PER_THREAD: usize = 4;

/// Search a query tree against a reference tree
///
/// `query_tree` must index `queries` and `reference_tree` must index
/// `references`; for a monochromatic search both may be the same tree.
#[allow(clippy::too_many_arguments)]
pub fn search<K: Kernel + ?Sized>(
    kernel: &K,
    queries: &Dataset,
    query_tree: &KernelTree,
    references: &Dataset,
    reference_tree: &KernelTree,
    k: usize,
    parallel: bool,
) -> Result<SearchResults> {
    validate(queries, references, k)?;
    if query_tree.len() != queries.len() || reference_tree.len() != references.len() {
        return Err(FastMksError::InvalidArgument(format!(
            "Trees index {} and {} points but the datasets hold {} and {}",
            query_tree.len(),
            reference_tree.len(),
            queries.len(),
            references.len()
        )));
    }

    let target = if parallel {
        rayon::current_num_threads() * TASKS_PER_THREAD
    } else {
        1
    };
    let roots = frontier(query_tree, target);

    // Candidate sets in query tree order
    let mut sets: Vec<CandidateSet> = (0..queries.len()).map(|_| CandidateSet::new(k)).collect();

    let mut tasks = Vec::with_capacity(roots.len());
    let mut rest: &mut [CandidateSet] = &mut sets;
    for &root in &roots {
        let node = query_tree.node(root);
        let (owned, tail) = std::mem::take(&mut rest).split_at_mut(node.count);
        rest = tail;
        tasks.push(DualTask {
            kernel,
            queries,
            references,
            query_tree,
            reference_tree,
            root,
            offset: node.begin,
            sets: owned,
            aggregates: vec![None; node.subtree_nodes],
            cache: KernelCache::new(DEFAULT_CACHE_CAPACITY),
            stats: SearchStats::default(),
        });
    }

    let outcomes: Vec<(SearchStats, CacheStats)> = if parallel {
        tasks
            .into_par_iter()
            .map(DualTask::run)
            .collect::<Result<_>>()?
    } else {
        tasks.into_iter().map(DualTask::run).collect::<Result<_>>()?
    };

    let mut stats = SearchStats::default();
    let mut cache = CacheStats::default();
    for (task_stats, cache_stats) in &outcomes {
        stats.merge(task_stats);
        cache.merge(cache_stats);
    }
    debug!(
        "Dual-tree search: {} tasks, {} base cases, {} scores, {} prunes, center cache hit rate {:.1}% ({} hits)",
        outcomes.len(),
        stats.base_cases,
        stats.scores,
        stats.prunes,
        cache.hit_rate() * 100.0,
        cache.hits
    );

    // Back to query order
    let mut ordered: Vec<(usize, CandidateSet)> =
        query_tree.indices().iter().copied().zip(sets).collect();
    ordered.sort_unstable_by_key(|(query, _)| *query);
    let sets = ordered.into_iter().map(|(_, set)| set).collect();

    let (indices, kernels) = assemble(sets, k)?;
    Ok(SearchResults {
        indices,
        kernels,
        stats,
    })
}

/// Cut the tree into at most `target` disjoint subtrees covering every point,
/// ordered by position in the index permutation.
fn frontier(tree: &KernelTree, target: usize) -> Vec<usize> {
    let mut roots = vec![0];
    while roots.len() < target {
        let largest = (0..roots.len())
            .filter(|&pos| !tree.node(roots[pos]).is_leaf())
            .max_by_key(|&pos| tree.node(roots[pos]).count);
        let pos = match largest {
            Some(pos) => pos,
            None => break,
        };
        if let Some((left, right)) = tree.node(roots[pos]).children {
            roots.splice(pos..=pos, [left, right]);
        }
    }
    roots.sort_unstable_by_key(|&id| tree.node(id).begin);
    roots
}

/// Worst kth-best candidate over a leaf's query points
fn leaf_aggregate(sets: &[CandidateSet]) -> Option<Candidate> {
    let mut aggregate: Option<Candidate> = None;
    for set in sets {
        let worst = *set.worst()?;
        aggregate = Some(match aggregate {
            Some(current) if worst.beats(&current) => current,
            _ => worst,
        });
    }
    aggregate
}

/// A (query node, reference node) pair with its bound and center kernel
struct Pair {
    query: usize,
    reference: usize,
    bound: f64,
    center_kernel: f64,
}

/// Traversal of one query subtree against the whole reference tree
struct DualTask<'a, K: Kernel + ?Sized> {
    kernel: &'a K,
    queries: &'a Dataset,
    references: &'a Dataset,
    query_tree: &'a KernelTree,
    reference_tree: &'a KernelTree,
    /// Query node id at the top of this task's subtree
    root: usize,
    /// Permutation position of the first owned query point
    offset: usize,
    sets: &'a mut [CandidateSet],
    /// Aggregate thresholds, indexed by `node id - root`
    aggregates: Vec<Option<Candidate>>,
    cache: KernelCache,
    stats: SearchStats,
}

impl<'a, K: Kernel + ?Sized> DualTask<'a, K> {
    fn run(mut self) -> Result<(SearchStats, CacheStats)> {
        let (query_tree, reference_tree) = (self.query_tree, self.reference_tree);

        let mut stack = Vec::new();
        let root_pair = self.score(self.root, 0)?;
        self.push(&mut stack, root_pair);

        while let Some(pair) = stack.pop() {
            if !self.admits(&pair) {
                self.stats.prunes += 1;
                continue;
            }

            let query = query_tree.node(pair.query);
            let reference = reference_tree.node(pair.reference);
            match (query.children, reference.children) {
                (None, None) => self.base_case(&pair)?,
                (None, Some((left, right))) => self.descend(
                    &mut stack,
                    (pair.query, left),
                    (pair.query, right),
                )?,
                (Some((left, right)), None) => self.descend(
                    &mut stack,
                    (left, pair.reference),
                    (right, pair.reference),
                )?,
                (Some((q_left, q_right)), Some((r_left, r_right))) => {
                    // Equal radii split the query side first
                    if query.radius >= reference.radius {
                        self.descend(&mut stack, (q_left, pair.reference), (q_right, pair.reference))?
                    } else {
                        self.descend(&mut stack, (pair.query, r_left), (pair.query, r_right))?
                    }
                }
            }
        }

        Ok((self.stats, self.cache.stats()))
    }

    /// Bound a node pair, looking the center kernel up in the cache first
    fn score(&mut self, query: usize, reference: usize) -> Result<Pair> {
        let query_node = self.query_tree.node(query);
        let reference_node = self.reference_tree.node(reference);
        let (qc, rc) = (query_node.center, reference_node.center);
        let (kernel, queries, references) = (self.kernel, self.queries, self.references);

        self.stats.scores += 1;
        let value = self.cache.get_or_insert_with(qc, rc, || {
            kernel.compute(queries.point(qc), references.point(rc))
        });
        let center_kernel = checked(value, qc, rc)?;

        Ok(Pair {
            query,
            reference,
            bound: node_node_bound(center_kernel, query_node, reference_node),
            center_kernel,
        })
    }

    fn admits(&self, pair: &Pair) -> bool {
        admits(
            self.aggregates[pair.query - self.root].as_ref(),
            pair.bound,
            self.reference_tree.node(pair.reference).min_index,
        )
    }

    fn push(&mut self, stack: &mut Vec<Pair>, pair: Pair) {
        if self.admits(&pair) {
            stack.push(pair);
        } else {
            self.stats.prunes += 1;
        }
    }

    /// Score two child pairs and push them so the higher bound is visited first
    fn descend(
        &mut self,
        stack: &mut Vec<Pair>,
        first: (usize, usize),
        second: (usize, usize),
    ) -> Result<()> {
        let first = self.score(first.0, first.1)?;
        let second = self.score(second.0, second.1)?;
        let (top, bottom) = if explore_first(
            (second.bound, second.center_kernel),
            (first.bound, first.center_kernel),
        ) {
            (second, first)
        } else {
            (first, second)
        };
        self.push(stack, bottom);
        self.push(stack, top);
        Ok(())
    }

    /// Evaluate a leaf pair, skipping query points the pair bound cannot help
    fn base_case(&mut self, pair: &Pair) -> Result<()> {
        let (query_tree, reference_tree) = (self.query_tree, self.reference_tree);
        let query_node = query_tree.node(pair.query);
        let reference_node = reference_tree.node(pair.reference);
        let reference_points = reference_tree.points(reference_node);

        for pos in query_node.range() {
            let set = &mut self.sets[pos - self.offset];
            if !set.admits(pair.bound, reference_node.min_index) {
                self.stats.prunes += 1;
                continue;
            }
            let q = query_tree.indices()[pos];
            for &r in reference_points {
                set.insert(r, evaluate(self.kernel, self.queries, self.references, q, r)?);
            }
            self.stats.base_cases += reference_points.len() as u64;
        }

        self.refresh(pair.query);
        Ok(())
    }

    /// Recompute a leaf's aggregate and carry the change towards the task root
    fn refresh(&mut self, leaf: usize) {
        let query_tree = self.query_tree;
        let node = query_tree.node(leaf);
        let start = node.begin - self.offset;
        let mut updated = leaf_aggregate(&self.sets[start..start + node.count]);
        let mut id = leaf;

        loop {
            let slot = &mut self.aggregates[id - self.root];
            if *slot == updated {
                break;
            }
            *slot = updated;
            if id == self.root {
                break;
            }
            id = match query_tree.node(id).parent {
                Some(parent) => parent,
                None => break,
            };
            updated = match query_tree.node(id).children {
                Some((left, right)) => looser(
                    self.aggregates[left - self.root],
                    self.aggregates[right - self.root],
                ),
                None => break,
            };
        }
    }
}
