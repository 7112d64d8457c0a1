use thiserror::Error;
use ucds_core::{Scalar, UcdsError};

/// Errors returned by the iterative solvers.
#[derive(Error, Debug)]
pub enum SolveError<T: Scalar> {
    /// Invalid input detected before iterating (wrong lengths, bad tolerance, ...).
    #[error(transparent)]
    Core(#[from] UcdsError),

    /// The iteration budget ran out, or the iteration broke down, before the
    /// residual norm dropped below the tolerance. The last iterate is kept so
    /// the caller can inspect it or restart from it.
    #[error(
        "solver did not converge after {iterations} iterations (residual={residual_norm:.3e}, tol={tolerance:.3e})"
    )]
    NotConverged {
        iterations: usize,
        residual_norm: T,
        tolerance: T,
        last_iterate: Vec<T>,
    },
}
