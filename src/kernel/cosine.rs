//! Cosine similarity kernel

use crate::kernel::traits::{dot, Kernel};

/// Cosine kernel: K(x, y) = <x, y> / (||x|| * ||y||)
///
/// Zero vectors map to the origin of the feature space, so any kernel value
/// involving a zero vector is 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineKernel;

impl CosineKernel {
    /// Create a new cosine kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for CosineKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        let norms = dot(x, x).sqrt() * dot(y, y).sqrt();
        if norms == 0.0 {
            0.0
        } else {
            dot(x, y) / norms
        }
    }

    fn self_compute(&self, x: &[f64]) -> f64 {
        if x.iter().all(|&v| v == 0.0) {
            0.0
        } else {
            1.0
        }
    }

    fn description(&self) -> String {
        "cosine".to_string()
    }
}
