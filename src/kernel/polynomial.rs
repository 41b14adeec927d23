//! Polynomial Kernel Implementation
//!
//! The polynomial kernel is defined as:
//! K(x, y) = (γ * <x, y> + r)^d
//!
//! Where:
//! - γ (gamma): scaling factor for the dot product
//! - r (coef0): offset added before exponentiation
//! - d (degree): degree of the polynomial
//!
//! With γ > 0 and r >= 0 the kernel is positive semi-definite for every
//! integer degree, which is what the search bounds rely on.

use crate::kernel::traits::{dot, Kernel};

/// Polynomial kernel with configurable degree, gamma, and offset
#[derive(Debug, Clone, Copy)]
pub struct PolynomialKernel {
    /// Scaling factor for the dot product (default: 1.0)
    pub gamma: f64,
    /// Offset added to the scaled dot product (default: 0.0)
    pub coef0: f64,
    /// Degree of the polynomial (default: 2)
    pub degree: u32,
}

impl PolynomialKernel {
    /// Creates a new polynomial kernel with the specified parameters
    ///
    /// # Arguments
    /// * `degree` - Degree of the polynomial (must be > 0)
    /// * `gamma` - Scaling factor for the dot product (must be > 0)
    /// * `coef0` - Offset (must be >= 0)
    ///
    /// # Examples
    /// ```
    /// use fastmks::kernel::PolynomialKernel;
    ///
    /// // Quadratic kernel: (x·y + 1)²
    /// let quad_kernel = PolynomialKernel::new(2, 1.0, 1.0);
    ///
    /// // Cubic kernel: (0.5·x·y + 1)³
    /// let cubic_kernel = PolynomialKernel::new(3, 0.5, 1.0);
    /// ```
    pub fn new(degree: u32, gamma: f64, coef0: f64) -> Self {
        assert!(degree > 0, "Polynomial degree must be positive");
        assert!(gamma > 0.0, "Gamma must be positive");
        assert!(coef0 >= 0.0, "Polynomial offset must be non-negative");

        Self {
            gamma,
            coef0,
            degree,
        }
    }

    /// Creates the unscaled kernel (<x,y> + offset)^degree
    ///
    /// # Examples
    /// ```
    /// use fastmks::kernel::PolynomialKernel;
    ///
    /// let kernel = PolynomialKernel::with_offset(5, 2.5);
    /// assert_eq!(kernel.gamma, 1.0);
    /// assert_eq!(kernel.coef0, 2.5);
    /// ```
    pub fn with_offset(degree: u32, offset: f64) -> Self {
        Self::new(degree, 1.0, offset)
    }

    /// Creates a quadratic kernel: (γ * <x,y> + 1)²
    pub fn quadratic(gamma: f64) -> Self {
        Self::new(2, gamma, 1.0)
    }

    /// Creates a cubic kernel: (γ * <x,y> + 1)³
    pub fn cubic(gamma: f64) -> Self {
        Self::new(3, gamma, 1.0)
    }

    /// Creates a polynomial kernel with gamma = 1.0 / n_features
    ///
    /// # Examples
    /// ```
    /// use fastmks::kernel::PolynomialKernel;
    ///
    /// // For a 100-dimensional dataset
    /// let kernel = PolynomialKernel::auto(3, 100);
    /// assert_eq!(kernel.gamma, 0.01);
    /// ```
    pub fn auto(degree: u32, n_features: usize) -> Self {
        let gamma = 1.0 / n_features as f64;
        Self::new(degree, gamma, 1.0)
    }

    fn apply(&self, dot_product: f64) -> f64 {
        (self.gamma * dot_product + self.coef0).powi(self.degree as i32)
    }
}

impl Default for PolynomialKernel {
    fn default() -> Self {
        Self::new(2, 1.0, 0.0)
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        // Negative bases are kept: clamping them would break positive semi-definiteness
        self.apply(dot(x, y))
    }

    fn description(&self) -> String {
        format!(
            "polynomial(degree={}, gamma={}, offset={})",
            self.degree, self.gamma, self.coef0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_polynomial_kernel_creation() {
        let kernel = PolynomialKernel::new(3, 0.5, 1.0);
        assert_eq!(kernel.degree, 3);
        assert_eq!(kernel.gamma, 0.5);
        assert_eq!(kernel.coef0, 1.0);
    }

    #[test]
    fn test_named_constructors() {
        let kernel = PolynomialKernel::quadratic(2.0);
        assert_eq!(kernel.degree, 2);
        assert_eq!(kernel.gamma, 2.0);
        assert_eq!(kernel.coef0, 1.0);

        let kernel = PolynomialKernel::cubic(0.5);
        assert_eq!(kernel.degree, 3);

        let kernel = PolynomialKernel::auto(2, 100);
        assert_eq!(kernel.gamma, 0.01);

        let kernel = PolynomialKernel::default();
        assert_eq!(kernel.degree, 2);
        assert_eq!(kernel.coef0, 0.0);
    }

    #[test]
    fn test_polynomial_kernel_computation() {
        let kernel = PolynomialKernel::new(2, 1.0, 1.0);

        // Dot product: 1*2 + 2*1 = 4
        // Kernel: (1.0 * 4 + 1.0)² = 5² = 25
        let result = kernel.compute(&[1.0, 2.0], &[2.0, 1.0]);
        assert_relative_eq!(result, 25.0, epsilon = 1e-10);
    }

    #[test]
    fn test_polynomial_kernel_same_vector() {
        let kernel = PolynomialKernel::new(3, 0.5, 2.0);

        // Dot product: 3² + 4² = 25
        // Kernel: (0.5 * 25 + 2.0)³ = 14.5³ = 3048.625
        let result = kernel.self_compute(&[3.0, 4.0]);
        assert_relative_eq!(result, 3048.625, epsilon = 1e-6);
    }

    #[test]
    fn test_polynomial_kernel_offset_form() {
        let kernel = PolynomialKernel::with_offset(5, 2.5);

        // (1*1 + 0*1 + 2.5)^5 = 3.5^5
        let result = kernel.compute(&[1.0, 0.0], &[1.0, 1.0]);
        assert_relative_eq!(result, 3.5f64.powi(5), max_relative = 1e-12);
    }

    #[test]
    fn test_polynomial_kernel_negative_base() {
        let kernel = PolynomialKernel::new(3, 1.0, 0.5);

        // Base: -2.0 + 0.5 = -1.5, odd degree keeps the sign
        let result = kernel.compute(&[1.0], &[-2.0]);
        assert_relative_eq!(result, -3.375, epsilon = 1e-12);
    }

    #[test]
    fn test_polynomial_kernel_high_degree() {
        let kernel = PolynomialKernel::new(5, 0.1, 1.0);

        // Dot product: 6.0
        // Kernel: (0.1 * 6.0 + 1.0)⁵ = 1.6⁵ ≈ 10.48576
        let result = kernel.compute(&[2.0], &[3.0]);
        assert_relative_eq!(result, 10.48576, epsilon = 1e-5);
    }

    #[test]
    fn test_description() {
        let kernel = PolynomialKernel::with_offset(5, 2.5);
        assert_eq!(
            kernel.description(),
            "polynomial(degree=5, gamma=1, offset=2.5)"
        );
    }

    #[test]
    #[should_panic(expected = "Polynomial degree must be positive")]
    fn test_invalid_degree() {
        PolynomialKernel::new(0, 1.0, 1.0);
    }

    #[test]
    #[should_panic(expected = "Gamma must be positive")]
    fn test_invalid_gamma() {
        PolynomialKernel::new(2, -1.0, 1.0);
    }

    #[test]
    #[should_panic(expected = "Polynomial offset must be non-negative")]
    fn test_invalid_offset() {
        PolynomialKernel::new(2, 1.0, -1.0);
    }
}
