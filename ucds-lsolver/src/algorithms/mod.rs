use crate::error::SolveError;
use serde::{Deserialize, Serialize};
use ucds_core::{Device, MatVecKind, Matrix, NormKind, NormMode, Scalar};

#[derive(Debug)]
pub struct SolveResult<V: Scalar, M> {
    pub x: Vec<V>,   // Solution vector
    pub metadata: M, // Metadata about the solve process
}

// --- Algorithm Trait Definition ---
/// Trait representing a specific linear system solving algorithm.
/// Generic over the execution device and the matrix type it supports.
pub trait SolveAlgorithm<D: Device, M: Matrix> {
    /// The numeric type the algorithm operates on. Must match `M::Value`.
    type Value: Scalar;
    type Metadata: std::fmt::Debug;

    /// Solves the linear system Ax = b for x.
    ///
    /// # Arguments
    ///
    /// * `device` - The execution device.
    /// * `a` - The coefficient matrix A.
    /// * `b` - The right-hand side vector b.
    /// * `x0` - Starting guess; the zero vector when `None`.
    fn solve(
        &self,
        device: &D,
        a: &M,
        b: &[Self::Value],
        x0: Option<&[Self::Value]>,
    ) -> Result<SolveResult<Self::Value, Self::Metadata>, SolveError<Self::Value>>;
}

pub mod cg;

pub use cg::{conjugate_gradient, CgMetadata};

/// When the residual counts as small enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConvergencePolicy {
    /// Converged when `norm(r) < tolerance`.
    #[default]
    Absolute,
    /// Converged when `norm(r) < tolerance * norm(r0)`.
    Relative,
}

/// Conjugate Gradient Algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConjugateGradient {
    pub tolerance: f64,
    /// Norm used to measure the residual.
    pub norm_mode: NormMode,
    pub policy: ConvergencePolicy,
    /// Matrix-vector strategy used by [`SolveAlgorithm::solve`].
    pub kernel: MatVecKind,
    /// Norm strategy used by [`SolveAlgorithm::solve`].
    pub norm: NormKind,
    /// Iteration cap; the matrix size when `None`.
    pub max_iterations: Option<usize>,
    /// Every this many iterations the residual is recomputed as `b - A x`
    /// instead of being updated. `floor(sqrt(size))` when `None`.
    pub recompute_interval: Option<usize>,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self {
            tolerance: 1e-6, // Default tolerance
            norm_mode: NormMode::L2,
            policy: ConvergencePolicy::Absolute,
            kernel: MatVecKind::RowPartitioned,
            norm: NormKind::Iterative,
            max_iterations: None,
            recompute_interval: None,
        }
    }
}

impl ConjugateGradient {
    /// Creates a new instance of the Conjugate Gradient algorithm with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new instance of the Conjugate Gradient algorithm with specified parameters.
    pub fn with_params(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations: Some(max_iterations),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cg = ConjugateGradient::new();
        assert_eq!(cg.tolerance, 1e-6);
        assert_eq!(cg.policy, ConvergencePolicy::Absolute);
        assert_eq!(cg.kernel, MatVecKind::RowPartitioned);
        assert_eq!(cg.max_iterations, None);

        let capped = ConjugateGradient::with_params(1e-3, 10);
        assert_eq!(capped.max_iterations, Some(10));
        assert_eq!(capped.norm, NormKind::Iterative);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "tolerance": 1e-8,
            "norm_mode": "Linf",
            "policy": "Relative",
            "kernel": "InnerParallel",
            "norm": "Recursive",
            "recompute_interval": 5
        }"#;
        let cg: ConjugateGradient = serde_json::from_str(json).unwrap();
        assert_eq!(cg.tolerance, 1e-8);
        assert_eq!(cg.norm_mode, NormMode::Linf);
        assert_eq!(cg.policy, ConvergencePolicy::Relative);
        assert_eq!(cg.kernel, MatVecKind::InnerParallel);
        assert_eq!(cg.norm, NormKind::Recursive);
        assert_eq!(cg.max_iterations, None);
        assert_eq!(cg.recompute_interval, Some(5));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cg: ConjugateGradient = serde_json::from_str(r#"{"max_iterations": 50}"#).unwrap();
        assert_eq!(cg, ConjugateGradient::with_params(1e-6, 50));
    }
}
