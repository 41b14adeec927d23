//! High-level API for max-kernel search
//!
//! This module provides a builder that indexes a reference set once and then
//! answers top-k max-kernel queries against it.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fastmks::api::MaxKernelSearch;
//! use fastmks::core::Dataset;
//! use fastmks::kernel::PolynomialKernel;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let references = Dataset::from_csv("references.csv")?;
//! let queries = Dataset::from_csv("queries.csv")?;
//!
//! let engine = MaxKernelSearch::with_kernel(PolynomialKernel::with_offset(3, 1.0))
//!     .with_leaf_size(20)
//!     .build(&references)?;
//!
//! let results = engine.search_queries(&queries, 5)?;
//! for (index, kernel) in results.neighbors(0) {
//!     println!("{index}: {kernel:.4}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::core::{Dataset, FastMksError, Result, SearchConfig, SearchMode};
use crate::kernel::{Kernel, LinearKernel};
use crate::search::{dual, naive, single, SearchResults};
use crate::tree::KernelTree;
use log::info;
use std::time::Instant;

/// Max-kernel search builder
pub struct MaxKernelSearch<K: Kernel = LinearKernel> {
    kernel: K,
    config: SearchConfig,
    single_mode: bool,
    naive_mode: bool,
}

impl MaxKernelSearch<LinearKernel> {
    /// Create a builder with the linear kernel and default parameters
    pub fn new() -> Self {
        Self::with_kernel(LinearKernel::new())
    }
}

impl Default for MaxKernelSearch<LinearKernel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kernel> MaxKernelSearch<K> {
    /// Create a builder with a custom kernel
    pub fn with_kernel(kernel: K) -> Self {
        Self {
            kernel,
            config: SearchConfig::default(),
            single_mode: false,
            naive_mode: false,
        }
    }

    /// Use single-tree traversal
    pub fn with_single_mode(mut self, single_mode: bool) -> Self {
        self.single_mode = single_mode;
        self.config.mode = SearchMode::from_flags(self.single_mode, self.naive_mode);
        self
    }

    /// Use brute-force evaluation; takes precedence over single-tree mode
    pub fn with_naive_mode(mut self, naive_mode: bool) -> Self {
        self.naive_mode = naive_mode;
        self.config.mode = SearchMode::from_flags(self.single_mode, self.naive_mode);
        self
    }

    /// Set the maximum number of points per tree leaf
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.config.leaf_size = leaf_size;
        self
    }

    /// Enable or disable multi-threaded traversal
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.single_mode = config.mode == SearchMode::SingleTree;
        self.naive_mode = config.mode == SearchMode::Naive;
        self.config = config;
        self
    }

    /// Index `references`; the engine borrows the dataset for its lifetime
    pub fn build(self, references: &Dataset) -> Result<FastMks<'_, K>> {
        if self.config.leaf_size == 0 {
            return Err(FastMksError::InvalidArgument(
                "Leaf size must be positive".to_string(),
            ));
        }
        references.check_finite()?;

        let start = Instant::now();
        let tree = match self.config.mode {
            SearchMode::Naive => None,
            SearchMode::SingleTree | SearchMode::DualTree => Some(KernelTree::build(
                references,
                &self.kernel,
                self.config.leaf_size,
            )?),
        };
        info!(
            "Prepared {} search over {} points (dimension {}, kernel {}) in {:.3?}",
            self.config.mode,
            references.len(),
            references.dim(),
            self.kernel.description(),
            start.elapsed()
        );

        Ok(FastMks {
            kernel: self.kernel,
            references,
            tree,
            config: self.config,
        })
    }
}

/// Search engine bound to an indexed reference set
pub struct FastMks<'a, K: Kernel> {
    kernel: K,
    references: &'a Dataset,
    tree: Option<KernelTree>,
    config: SearchConfig,
}

impl<'a, K: Kernel> FastMks<'a, K> {
    /// Top-k references for every reference point, each point included
    pub fn search(&self, k: usize) -> Result<SearchResults> {
        let start = Instant::now();
        let references = self.references;
        let parallel = self.config.parallel;

        let results = match self.config.mode {
            SearchMode::Naive => naive::search(&self.kernel, references, references, k, parallel)?,
            SearchMode::SingleTree => single::search(
                &self.kernel,
                references,
                self.reference_tree()?,
                references,
                k,
                parallel,
            )?,
            SearchMode::DualTree => {
                let tree = self.reference_tree()?;
                dual::search(&self.kernel, references, tree, references, tree, k, parallel)?
            }
        };

        self.log_summary(&results, start);
        Ok(results)
    }

    /// Top-k references for every point of a separate query set
    pub fn search_queries(&self, queries: &Dataset, k: usize) -> Result<SearchResults> {
        if queries.dim() != self.references.dim() {
            return Err(FastMksError::dimension_mismatch(
                self.references.dim(),
                queries.dim(),
            ));
        }

        let start = Instant::now();
        let references = self.references;
        let parallel = self.config.parallel;

        let results = match self.config.mode {
            SearchMode::Naive => naive::search(&self.kernel, queries, references, k, parallel)?,
            SearchMode::SingleTree => single::search(
                &self.kernel,
                queries,
                self.reference_tree()?,
                references,
                k,
                parallel,
            )?,
            SearchMode::DualTree => {
                queries.check_finite()?;
                let query_tree = KernelTree::build(queries, &self.kernel, self.config.leaf_size)?;
                dual::search(
                    &self.kernel,
                    queries,
                    &query_tree,
                    references,
                    self.reference_tree()?,
                    k,
                    parallel,
                )?
            }
        };

        self.log_summary(&results, start);
        Ok(results)
    }

    /// Traversal strategy in use
    pub fn mode(&self) -> SearchMode {
        self.config.mode
    }

    /// Engine configuration
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// The indexed reference set
    pub fn references(&self) -> &'a Dataset {
        self.references
    }

    /// Reference tree; `None` in naive mode
    pub fn tree(&self) -> Option<&KernelTree> {
        self.tree.as_ref()
    }

    fn reference_tree(&self) -> Result<&KernelTree> {
        self.tree.as_ref().ok_or_else(|| {
            FastMksError::ConstructionError(format!(
                "No reference tree was built for {} search",
                self.config.mode
            ))
        })
    }

    fn log_summary(&self, results: &SearchResults, start: Instant) {
        info!(
            "{} search: {} queries, k = {}, {} kernel evaluations, {} prunes in {:.3?}",
            self.config.mode,
            results.n_queries(),
            results.k(),
            results.stats.base_cases,
            results.stats.prunes,
            start.elapsed()
        );
    }
}

/// Convenience functions for quick operations
pub mod quick {
    use super::*;
    use std::path::Path;

    /// Dual-tree top-k search of a dataset against itself
    pub fn max_kernel_search<K: Kernel>(
        dataset: &Dataset,
        kernel: K,
        k: usize,
    ) -> Result<SearchResults> {
        MaxKernelSearch::with_kernel(kernel).build(dataset)?.search(k)
    }

    /// Dual-tree top-k search of `queries` against `references`
    pub fn max_kernel_search_queries<K: Kernel>(
        references: &Dataset,
        queries: &Dataset,
        kernel: K,
        k: usize,
    ) -> Result<SearchResults> {
        MaxKernelSearch::with_kernel(kernel)
            .build(references)?
            .search_queries(queries, k)
    }

    /// Largest inner products within a CSV file, with default parameters
    pub fn search_csv<P: AsRef<Path>>(path: P, k: usize) -> Result<SearchResults> {
        let dataset = Dataset::from_csv(path)?;
        max_kernel_search(&dataset, LinearKernel::new(), k)
    }
}
