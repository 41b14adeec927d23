//! RBF (Radial Basis Function) kernel implementation
//!
//! The RBF kernel is defined as: K(x, y) = exp(-γ * ||x - y||²)
//! where γ (gamma) is a hyperparameter that controls the kernel width.

use crate::kernel::Kernel;

/// RBF (Gaussian) kernel: K(x, y) = exp(-γ * ||x - y||²)
///
/// Every point has self-kernel 1, so every point lies on the unit sphere of
/// the feature space and the largest kernel value is reached by the nearest
/// neighbour in input space.
#[derive(Debug, Clone, Copy)]
pub struct RBFKernel {
    gamma: f64,
}

/// The Gaussian kernel, as the command line names it
pub type GaussianKernel = RBFKernel;

impl RBFKernel {
    /// Create a new RBF kernel with specified gamma parameter
    ///
    /// # Panics
    /// Panics if gamma is not positive
    pub fn new(gamma: f64) -> Self {
        assert!(gamma > 0.0, "Gamma must be positive, got: {}", gamma);
        Self { gamma }
    }

    /// Create the Gaussian kernel exp(-||x - y||² / (2σ²)) from its bandwidth σ
    ///
    /// # Panics
    /// Panics if the bandwidth is not positive
    pub fn from_bandwidth(bandwidth: f64) -> Self {
        assert!(
            bandwidth > 0.0,
            "Bandwidth must be positive, got: {}",
            bandwidth
        );
        Self::new(1.0 / (2.0 * bandwidth * bandwidth))
    }

    /// Create RBF kernel with gamma = 1.0 / n_features
    pub fn with_auto_gamma(n_features: usize) -> Self {
        assert!(n_features > 0, "Number of features must be positive");
        Self::new(1.0 / n_features as f64)
    }

    /// Get the gamma parameter
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Default for RBFKernel {
    /// Default RBF kernel with gamma = 1.0
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Kernel for RBFKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        let squared_distance: f64 = x
            .iter()
            .zip(y)
            .map(|(a, b)| {
                let diff = a - b;
                diff * diff
            })
            .sum();
        (-self.gamma * squared_distance).exp()
    }

    fn self_compute(&self, _x: &[f64]) -> f64 {
        1.0
    }

    fn description(&self) -> String {
        format!("gaussian(gamma={})", self.gamma)
    }
}
