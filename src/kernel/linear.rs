//! Linear kernel implementation

use crate::kernel::traits::dot;
use crate::kernel::Kernel;

/// Linear kernel: K(x, y) = x^T * y
///
/// This is the simplest kernel function, computing the dot product between two vectors.
/// Max-kernel search with it is maximum inner product search.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        dot(x, y)
    }

    fn self_compute(&self, x: &[f64]) -> f64 {
        x.iter().map(|v| v * v).sum()
    }

    fn description(&self) -> String {
        "linear".to_string()
    }
}
