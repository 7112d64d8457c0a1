//! Conjugate Gradient over UCDS matrices.
//!
//! ```text
//! r = b - A x0
//! d = r
//! delta = r . r
//! while not converged:
//!     q     = A d
//!     alpha = delta / (d . q)
//!     x     = x + alpha d
//!     r     = b - A x          every `recompute_interval` iterations
//!     r     = r - alpha q      otherwise
//!     beta  = (r . r) / delta
//!     d     = r + beta d
//! ```
//!
//! The cheap update `r -= alpha q` drifts away from the true residual as
//! rounding errors accumulate; the periodic exact recomputation bounds that
//! drift. The multiplication and norm strategies are passed in as trait
//! objects or generics, so the iteration itself does not depend on how they
//! are parallelized.

use log::{debug, info, trace, warn};
use ucds_core::{ops, CpuDevice, MatVec, NormMode, Scalar, UcdsError, UcdsMatrix, VectorNorm};

use super::{ConjugateGradient, ConvergencePolicy, SolveAlgorithm, SolveResult};
use crate::error::SolveError;

#[derive(Debug, Clone, Copy)]
pub struct CgMetadata<T> {
    pub iterations: usize,
    pub residual_norm: T,
    pub initial_residual_norm: T,
    /// How many times the residual was recomputed from scratch.
    pub recomputations: usize,
}

impl<T: Scalar> SolveAlgorithm<CpuDevice, UcdsMatrix<T>> for ConjugateGradient {
    type Value = T;
    type Metadata = CgMetadata<T>;

    fn solve(
        &self,
        device: &CpuDevice,
        a: &UcdsMatrix<T>,
        b: &[T],
        x0: Option<&[T]>,
    ) -> Result<SolveResult<T, CgMetadata<T>>, SolveError<T>> {
        let zeros;
        let x0 = match x0 {
            Some(x0) => x0,
            None => {
                zeros = vec![T::zero(); a.size()];
                &zeros
            }
        };
        device.install(|| self.solve_with(a, b, x0, &self.kernel, &self.norm))
    }
}

impl ConjugateGradient {
    /// Solves `A x = b` starting from `x0` with the given strategies.
    ///
    /// `self.kernel` and `self.norm` are ignored here; the explicit
    /// `multiply` and `norm` arguments are used instead.
    pub fn solve_with<T, K, N>(
        &self,
        a: &UcdsMatrix<T>,
        b: &[T],
        x0: &[T],
        multiply: &K,
        norm: &N,
    ) -> Result<SolveResult<T, CgMetadata<T>>, SolveError<T>>
    where
        T: Scalar,
        K: MatVec<T> + ?Sized,
        N: VectorNorm<T> + ?Sized,
    {
        let n = a.size();
        if b.len() != n {
            return Err(UcdsError::InvalidArgument(format!(
                "Matrix size ({}) must match RHS vector b length ({})",
                n,
                b.len()
            ))
            .into());
        }
        if x0.len() != n {
            return Err(UcdsError::InvalidArgument(format!(
                "Matrix size ({}) must match initial guess x0 length ({})",
                n,
                x0.len()
            ))
            .into());
        }
        let tolerance: T = num_traits::cast(self.tolerance)
            .filter(|t: &T| t.is_finite() && *t > T::zero())
            .ok_or_else(|| {
                UcdsError::InvalidArgument(format!(
                    "Tolerance must be finite and positive, got {}",
                    self.tolerance
                ))
            })?;
        if !a.is_symmetric() {
            warn!("Conjugate gradient called on a non-symmetric matrix; convergence is not guaranteed.");
        }

        let max_iterations = self.max_iterations.unwrap_or(n);
        let recompute_interval = self
            .recompute_interval
            .unwrap_or_else(|| (n as f64).sqrt().floor() as usize)
            .max(1);
        let mode = self.norm_mode;
        info!(
            "Starting CG: size={}, kernel={}, norm={} ({:?}), tolerance={:e}, max_iterations={}",
            n,
            multiply.name(),
            norm.name(),
            mode,
            tolerance,
            max_iterations
        );

        let mut x = x0.to_vec();
        let mut q = vec![T::zero(); n];
        let mut r = vec![T::zero(); n];
        // Second residual buffer; also holds the next search direction while it is built.
        let mut scratch = vec![T::zero(); n];

        multiply.multiply_into(a, &x, &mut q)?;
        ops::sub(b, &q, &mut r)?;
        let mut d = r.clone();
        let mut delta_new = ops::self_dot(&r);

        let initial_residual_norm = norm.norm(&r, mode);
        let threshold = match self.policy {
            ConvergencePolicy::Absolute => tolerance,
            ConvergencePolicy::Relative => tolerance * initial_residual_norm,
        };
        let converged = |res: T| res < threshold || res == T::zero();
        debug!(
            "Initial residual norm: {:e}, convergence threshold: {:e}",
            initial_residual_norm, threshold
        );

        let mut residual_norm = initial_residual_norm;
        let mut iterations = 0;
        let mut recomputations = 0;
        let not_converged = |iterations, residual_norm, x: Vec<T>| SolveError::NotConverged {
            iterations,
            residual_norm,
            tolerance: threshold,
            last_iterate: x,
        };

        while !converged(residual_norm) {
            if iterations > max_iterations {
                warn!(
                    "CG reached maximum iterations ({}) without converging (residual norm {:e}).",
                    max_iterations, residual_norm
                );
                return Err(not_converged(iterations, residual_norm, x));
            }

            multiply.multiply_into(a, &d, &mut q)?;
            let dq = ops::dot(&d, &q)?;
            let alpha = delta_new / dq;
            if dq == T::zero() || !alpha.is_finite() {
                warn!(
                    "CG breakdown at iteration {}: d^T A d = {:e}; the matrix is probably not positive definite.",
                    iterations, dq
                );
                return Err(not_converged(iterations, residual_norm, x));
            }

            ops::axpy_inplace(&mut x, alpha, &d)?;
            if iterations % recompute_interval == 0 {
                // q is no longer needed this iteration; reuse it for A x.
                multiply.multiply_into(a, &x, &mut q)?;
                ops::sub(b, &q, &mut scratch)?;
                recomputations += 1;
            } else {
                ops::combine(&mut scratch, &r, T::one(), &q, -alpha)?;
            }
            std::mem::swap(&mut r, &mut scratch);

            let delta_old = delta_new;
            delta_new = ops::self_dot(&r);
            let beta = delta_new / delta_old;
            ops::combine(&mut scratch, &r, T::one(), &d, beta)?;
            std::mem::swap(&mut d, &mut scratch);

            iterations += 1;
            residual_norm = norm.norm(&r, mode);
            trace!("Iteration {}: residual norm = {:e}", iterations, residual_norm);
        }

        info!(
            "CG converged in {} iterations (residual norm {:e}).",
            iterations, residual_norm
        );
        Ok(SolveResult {
            x,
            metadata: CgMetadata {
                iterations,
                residual_norm,
                initial_residual_norm,
                recomputations,
            },
        })
    }
}

/// Solves `A x = b` from `x0` with an absolute tolerance on `norm(r, mode)`,
/// using the given multiplication and norm strategies.
///
/// Runs at most `size + 1` iterations; exhausting them yields
/// [`SolveError::NotConverged`] with the last iterate.
pub fn conjugate_gradient<T, K, N>(
    a: &UcdsMatrix<T>,
    b: &[T],
    x0: &[T],
    tolerance: T,
    multiply: &K,
    norm: &N,
    mode: NormMode,
) -> Result<SolveResult<T, CgMetadata<T>>, SolveError<T>>
where
    T: Scalar,
    K: MatVec<T> + ?Sized,
    N: VectorNorm<T> + ?Sized,
{
    let algorithm = ConjugateGradient {
        tolerance: tolerance.to_f64().unwrap_or(f64::NAN),
        norm_mode: mode,
        ..ConjugateGradient::default()
    };
    algorithm.solve_with(a, b, x0, multiply, norm)
}
