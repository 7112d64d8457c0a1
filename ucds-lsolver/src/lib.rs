//! `ucds-lsolver`: iterative solvers for linear systems stored in UCDS format.
//!
//! Solves `A x = b` for symmetric positive definite banded matrices with the
//! Conjugate Gradient method. The matrix-vector product and the residual norm
//! are pluggable strategies from `ucds-core`.

pub mod algorithms;
pub mod error;

pub use error::SolveError;

// Re-export from ucds_core
pub use ucds_core::{
    CpuDevice, MatVec, MatVecKind, Matrix, NormKind, NormMode, Scalar, UcdsError, UcdsMatrix,
    VectorNorm,
};
