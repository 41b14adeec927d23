//! Exact max-kernel search (FastMKS)
//!
//! For every query point, finds the k reference points with the largest
//! kernel value K(query, reference) using ball trees built in the kernel's
//! feature space. Naive, single-tree and dual-tree traversals return identical
//! results; the tree traversals skip subtrees whose kernel bound cannot beat
//! the current kth best value.

pub mod api;
pub mod cache;
pub mod core;
pub mod data;
pub mod kernel;
pub mod persistence;
pub mod search;
pub mod tree;

// Re-export main types for convenience
pub use crate::api::{FastMks, MaxKernelSearch};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::core::types::*;
pub use crate::core::{FastMksError, Result};
pub use crate::kernel::{
    CosineKernel, GaussianKernel, Kernel, LinearKernel, PolynomialKernel, RBFKernel,
};
pub use crate::search::{Candidate, CandidateSet, SearchResults};
pub use crate::tree::{KernelTree, Node};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
