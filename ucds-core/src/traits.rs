use crate::error::Result;
use crate::norm::NormMode;
use crate::ucds_matrix::UcdsMatrix;
use num_traits::Float;
use std::borrow::Cow;
use std::fmt::{Debug, Display, LowerExp};
use std::iter::Sum;

/// Floating point element type stored in matrices and vectors.
/// Implemented for every `Float` that can cross thread boundaries; in practice `f32` and `f64`.
pub trait Scalar:
    Float + Sum + Send + Sync + Debug + Display + LowerExp + Default + 'static
{
}

impl<T> Scalar for T where
    T: Float + Sum + Send + Sync + Debug + Display + LowerExp + Default + 'static
{
}

/// Generic trait representing a square or rectangular matrix.
pub trait Matrix: Debug {
    /// The underlying numeric type of the matrix elements (e.g., f32, f64).
    type Value: Copy + Debug + Default;

    /// Returns the dimensions of the matrix as (rows, columns).
    fn dims(&self) -> (usize, usize);

    /// Returns the number of rows.
    fn rows(&self) -> usize {
        self.dims().0
    }

    /// Returns the number of columns.
    fn cols(&self) -> usize {
        self.dims().1
    }

    /// Checks if the matrix is square.
    fn is_square(&self) -> bool {
        let (rows, cols) = self.dims();
        rows == cols
    }
}

/// A matrix-vector multiplication strategy over UCDS storage.
///
/// Every implementation computes the same `y = A x`; they differ only in how
/// the work is split across threads, so results agree up to floating point
/// summation order.
pub trait MatVec<T: Scalar>: Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> Cow<'static, str>;

    /// Writes `A x` into `y`. Both `x` and `y` must have length `a.size()`.
    fn multiply_into(&self, a: &UcdsMatrix<T>, x: &[T], y: &mut [T]) -> Result<()>;

    /// Allocating variant of [`MatVec::multiply_into`].
    fn multiply(&self, a: &UcdsMatrix<T>, x: &[T]) -> Result<Vec<T>> {
        let mut y = vec![T::zero(); a.size()];
        self.multiply_into(a, x, &mut y)?;
        Ok(y)
    }
}

/// A vector norm strategy.
pub trait VectorNorm<T: Scalar>: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the norm of `x` in the given mode. An empty vector has norm zero.
    fn norm(&self, x: &[T], mode: NormMode) -> T;
}
