//! Kernel trait definition

/// Kernel function trait
///
/// A kernel K(x, y) used for max-kernel search must be symmetric, deterministic
/// and positive semi-definite (Mercer's condition). The search bounds treat
/// K as an inner product <φ(x), φ(y)> in some feature space, so a kernel that
/// is not positive semi-definite can make tree pruning discard true results.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &[f64], y: &[f64]) -> f64;

    /// Compute the self-kernel K(x, x), the squared feature-space norm of x
    fn self_compute(&self, x: &[f64]) -> f64 {
        self.compute(x, x)
    }

    /// Short human readable description including hyperparameters
    fn description(&self) -> String;
}

/// Plain dot product of two equally sized dense vectors
pub(crate) fn dot(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len(), "Vectors must have the same dimension");
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantKernel;

    impl Kernel for ConstantKernel {
        fn compute(&self, _x: &[f64], _y: &[f64]) -> f64 {
            2.0
        }

        fn description(&self) -> String {
            "constant".to_string()
        }
    }

    #[test]
    fn test_default_self_compute() {
        assert_eq!(ConstantKernel.self_compute(&[1.0, 2.0]), 2.0);
    }

    #[test]
    fn test_dot() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, -5.0, 6.0]), 12.0);
        assert_eq!(dot(&[], &[]), 0.0);
    }
}
