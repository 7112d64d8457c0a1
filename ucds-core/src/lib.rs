//! # UCDS Core Library
//!
//! Ultra Compressed Diagonal Storage (UCDS) for banded square matrices, the
//! matrix-vector kernels that run on it, and the vector primitives an
//! iterative solver needs.

pub mod device;
pub mod error;
pub mod kernels;
pub mod norm;
pub mod ops;
pub mod traits;
pub mod ucds_matrix;

pub use device::{CpuDevice, Device};
pub use error::UcdsError;
pub use kernels::{
    multiply, multiply_inner, multiply_outer, FixedBand, InnerParallel, MatVecKind,
    OuterParallel, Pentadiagonal, RowPartitioned, Serial, Stencil27,
};
pub use norm::{norm, norm_recursive, IterativeNorm, NormKind, NormMode, RecursiveNorm};
pub use ops::{add, axpy_inplace, combine, dot, scale, sub};
pub use traits::{MatVec, Matrix, Scalar, VectorNorm};
pub use ucds_matrix::{build_m_matrix, create_matrix, destroy_matrix, UcdsMatrix};
