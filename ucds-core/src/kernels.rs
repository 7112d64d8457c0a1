//! Matrix-vector multiplication kernels over [`UcdsMatrix`].
//!
//! All kernels compute, for every stored diagonal with offset `k`:
//!
//! ```text
//! for j in max(0, k) ..= min(N-1, N-1+k):
//!     y[j - k] += values[block(k)][j] * x[j]
//! ```
//!
//! Different diagonals write to overlapping output slots, so the kernels
//! differ in how they avoid racing on `y`:
//!
//! - [`RowPartitioned`] (the default) turns the scatter into a gather: each
//!   output slot `y[r]` is owned by one worker, which walks every diagonal
//!   for that row. No synchronization, and per-row summation order matches
//!   [`Serial`] exactly.
//! - [`OuterParallel`] hands whole diagonals to workers; every worker
//!   accumulates into a private buffer and the buffers are summed afterwards.
//! - [`InnerParallel`] walks diagonals one at a time and splits the columns
//!   of the current diagonal across workers. Inside one diagonal every column
//!   writes a distinct slot; the end of each diagonal is a join barrier.
//! - [`FixedBand`] is the row-partitioned kernel specialized at compile time
//!   for a known number of diagonals.

use crate::error::{check_len, Result, UcdsError};
use crate::traits::{MatVec, Scalar};
use crate::ucds_matrix::{stored_columns, UcdsMatrix};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Minimum number of output rows handed to one worker.
const ROWS_PER_TASK: usize = 1024;

fn check_operands<T: Scalar>(a: &UcdsMatrix<T>, x: &[T], y: &[T]) -> Result<()> {
    check_len("Input vector x", x.len(), a.size())?;
    check_len("Output vector y", y.len(), a.size())
}

/// Adds the contribution of the diagonal at position `index` into `acc`.
fn accumulate_diagonal<T: Scalar>(a: &UcdsMatrix<T>, index: usize, x: &[T], acc: &mut [T]) {
    let k = a.offsets()[index];
    let block = a.block(index);
    for j in stored_columns(a.size(), k) {
        let row = (j as isize - k) as usize;
        acc[row] = acc[row] + block[j] * x[j];
    }
}

/// `y[row]` gathered over `offsets`; `values` holds one padded block of length `n` per offset.
#[inline(always)]
fn gather_row<T: Scalar>(n: usize, row: usize, offsets: &[isize], values: &[T], x: &[T]) -> T {
    let mut sum = T::zero();
    for (i, &k) in offsets.iter().enumerate() {
        let col = row as isize + k;
        if col >= 0 && (col as usize) < n {
            let col = col as usize;
            sum = sum + values[i * n + col] * x[col];
        }
    }
    sum
}

/// Single-threaded reference kernel: exactly the defining loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serial;

impl<T: Scalar> MatVec<T> for Serial {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("serial")
    }

    fn multiply_into(&self, a: &UcdsMatrix<T>, x: &[T], y: &mut [T]) -> Result<()> {
        check_operands(a, x, y)?;
        y.fill(T::zero());
        for index in 0..a.num_diagonals() {
            accumulate_diagonal(a, index, x, y);
        }
        Ok(())
    }
}

/// Output-partitioned kernel; every output slot has a single owning worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowPartitioned;

impl<T: Scalar> MatVec<T> for RowPartitioned {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("row-partitioned")
    }

    fn multiply_into(&self, a: &UcdsMatrix<T>, x: &[T], y: &mut [T]) -> Result<()> {
        check_operands(a, x, y)?;
        let n = a.size();
        let (offsets, values) = (a.offsets(), a.values());
        y.par_iter_mut()
            .with_min_len(ROWS_PER_TASK)
            .enumerate()
            .for_each(|(row, out)| *out = gather_row(n, row, offsets, values, x));
        Ok(())
    }
}

/// Diagonal-parallel kernel with per-worker accumulation buffers merged at the end.
#[derive(Debug, Clone, Copy, Default)]
pub struct OuterParallel;

impl<T: Scalar> MatVec<T> for OuterParallel {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("outer-parallel")
    }

    fn multiply_into(&self, a: &UcdsMatrix<T>, x: &[T], y: &mut [T]) -> Result<()> {
        check_operands(a, x, y)?;
        let n = a.size();
        let sum = (0..a.num_diagonals())
            .into_par_iter()
            .fold(
                || vec![T::zero(); n],
                |mut acc, index| {
                    accumulate_diagonal(a, index, x, &mut acc);
                    acc
                },
            )
            .reduce(
                || vec![T::zero(); n],
                |mut acc, partial| {
                    acc.iter_mut()
                        .zip(partial)
                        .for_each(|(out, v)| *out = *out + v);
                    acc
                },
            );
        y.copy_from_slice(&sum);
        Ok(())
    }
}

/// Column-parallel kernel; diagonals are processed one after another.
#[derive(Debug, Clone, Copy, Default)]
pub struct InnerParallel;

impl<T: Scalar> MatVec<T> for InnerParallel {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("inner-parallel")
    }

    fn multiply_into(&self, a: &UcdsMatrix<T>, x: &[T], y: &mut [T]) -> Result<()> {
        check_operands(a, x, y)?;
        y.fill(T::zero());
        for (index, &k) in a.offsets().iter().enumerate() {
            let cols = stored_columns(a.size(), k);
            let rows = (cols.start as isize - k) as usize..(cols.end as isize - k) as usize;
            let block = &a.block(index)[cols.clone()];
            y[rows]
                .par_iter_mut()
                .with_min_len(ROWS_PER_TASK)
                .zip(block.par_iter().zip(x[cols].par_iter()))
                .for_each(|(out, (&v, &xj))| *out = *out + v * xj);
        }
        Ok(())
    }
}

/// Row-partitioned kernel for matrices with exactly `D` diagonals.
///
/// The offsets are copied into a `[isize; D]`, which lets the compiler unroll
/// the per-row loop. Matrices with a different diagonal count are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedBand<const D: usize>;

/// Five-diagonal specialization (2-D five-point stencils).
pub type Pentadiagonal = FixedBand<5>;

/// 27-diagonal specialization (3-D 27-point stencils).
pub type Stencil27 = FixedBand<27>;

impl<T: Scalar, const D: usize> MatVec<T> for FixedBand<D> {
    fn name(&self) -> Cow<'static, str> {
        Cow::Owned(format!("fixed-band-{}", D))
    }

    fn multiply_into(&self, a: &UcdsMatrix<T>, x: &[T], y: &mut [T]) -> Result<()> {
        let offsets: [isize; D] = a.offsets().try_into().map_err(|_| {
            UcdsError::InvalidArgument(format!(
                "Fixed-band kernel expects {} diagonals, matrix has {}",
                D,
                a.num_diagonals()
            ))
        })?;
        check_operands(a, x, y)?;
        let n = a.size();
        let values = a.values();
        y.par_iter_mut()
            .with_min_len(ROWS_PER_TASK)
            .enumerate()
            .for_each(|(row, out)| *out = gather_row(n, row, &offsets, values, x));
        Ok(())
    }
}

/// Serializable selector for a multiplication strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatVecKind {
    Serial,
    #[default]
    RowPartitioned,
    OuterParallel,
    InnerParallel,
}

impl MatVecKind {
    pub const ALL: [MatVecKind; 4] = [
        MatVecKind::Serial,
        MatVecKind::RowPartitioned,
        MatVecKind::OuterParallel,
        MatVecKind::InnerParallel,
    ];
}

impl<T: Scalar> MatVec<T> for MatVecKind {
    fn name(&self) -> Cow<'static, str> {
        match self {
            MatVecKind::Serial => MatVec::<T>::name(&Serial),
            MatVecKind::RowPartitioned => MatVec::<T>::name(&RowPartitioned),
            MatVecKind::OuterParallel => MatVec::<T>::name(&OuterParallel),
            MatVecKind::InnerParallel => MatVec::<T>::name(&InnerParallel),
        }
    }

    fn multiply_into(&self, a: &UcdsMatrix<T>, x: &[T], y: &mut [T]) -> Result<()> {
        match self {
            MatVecKind::Serial => Serial.multiply_into(a, x, y),
            MatVecKind::RowPartitioned => RowPartitioned.multiply_into(a, x, y),
            MatVecKind::OuterParallel => OuterParallel.multiply_into(a, x, y),
            MatVecKind::InnerParallel => InnerParallel.multiply_into(a, x, y),
        }
    }
}

/// `out = A x` with the default (row-partitioned) kernel.
pub fn multiply<T: Scalar>(a: &UcdsMatrix<T>, x: &[T], out: &mut [T]) -> Result<()> {
    RowPartitioned.multiply_into(a, x, out)
}

/// `out = A x`, parallel across diagonals.
pub fn multiply_outer<T: Scalar>(a: &UcdsMatrix<T>, x: &[T], out: &mut [T]) -> Result<()> {
    OuterParallel.multiply_into(a, x, out)
}

/// `out = A x`, parallel across the columns of each diagonal.
pub fn multiply_inner<T: Scalar>(a: &UcdsMatrix<T>, x: &[T], out: &mut [T]) -> Result<()> {
    InnerParallel.multiply_into(a, x, out)
}

impl<T: Scalar> UcdsMatrix<T> {
    /// Performs `y = self * x` with the default kernel.
    pub fn spmv(&self, x: &[T], y: &mut [T]) -> Result<()> {
        multiply(self, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn kernels() -> Vec<Box<dyn MatVec<f64>>> {
        vec![
            Box::new(Serial),
            Box::new(RowPartitioned),
            Box::new(OuterParallel),
            Box::new(InnerParallel),
        ]
    }

    #[test]
    fn test_identity_returns_input() {
        let a = UcdsMatrix::m_matrix(6, &[0], &[1.0]).unwrap();
        let x = [1.5, -2.0, 0.25, 8.0, -0.125, 3.0];
        for kernel in kernels() {
            assert_eq!(kernel.multiply(&a, &x).unwrap(), x, "{}", kernel.name());
        }
    }

    #[test]
    fn test_two_by_two_literal() {
        // [ 1 2 ]
        // [ 3 4 ]
        let a = UcdsMatrix::from_diagonals(2, &[-1, 0, 1], vec![3.0, 0.0, 1.0, 4.0, 0.0, 2.0])
            .unwrap();
        for kernel in kernels() {
            assert_eq!(kernel.multiply(&a, &[5.0, 6.0]).unwrap(), vec![17.0, 39.0]);
        }
    }

    #[test]
    fn test_m_matrix_literal() {
        let a = UcdsMatrix::m_matrix(2, &[-1, 0, 1], &[-1.0, 4.0, -1.0]).unwrap();
        for kernel in kernels() {
            assert_eq!(kernel.multiply(&a, &[5.0, 6.0]).unwrap(), vec![14.0, 19.0]);
        }
    }

    #[test]
    fn test_padding_is_never_read() {
        let mut a = UcdsMatrix::m_matrix(4, &[-2, 0, 3], &[-1.0, 5.0, -1.0]).unwrap();
        a.diagonal_mut(-2).unwrap()[2..].fill(f64::NAN);
        a.diagonal_mut(3).unwrap()[..3].fill(f64::NAN);
        let x = [1.0, 2.0, 3.0, 4.0];
        let expected = vec![5.0 - 4.0, 10.0, 15.0 - 1.0, 20.0 - 2.0];
        for kernel in kernels() {
            assert_eq!(kernel.multiply(&a, &x).unwrap(), expected, "{}", kernel.name());
        }
    }

    #[test]
    fn test_overwrites_output() {
        let a = UcdsMatrix::m_matrix(3, &[0], &[2.0]).unwrap();
        for kernel in kernels() {
            let mut y = vec![100.0; 3];
            kernel.multiply_into(&a, &[1.0, 2.0, 3.0], &mut y).unwrap();
            assert_eq!(y, vec![2.0, 4.0, 6.0]);
        }
    }

    #[test]
    fn test_rejects_wrong_lengths() {
        let a = UcdsMatrix::m_matrix(3, &[-1, 0, 1], &[-1.0, 4.0, -1.0]).unwrap();
        for kernel in kernels() {
            let mut y = vec![0.0; 3];
            assert!(matches!(
                kernel.multiply_into(&a, &[1.0, 2.0], &mut y),
                Err(UcdsError::InvalidArgument(_))
            ));
            let mut short = vec![0.0; 2];
            assert!(matches!(
                kernel.multiply_into(&a, &[1.0, 2.0, 3.0], &mut short),
                Err(UcdsError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_fixed_band_matches_generic() {
        let a = UcdsMatrix::m_matrix(40, &[-3, -1, 0, 1, 3], &[-1.0, -1.0, 4.0, -1.0, -1.0])
            .unwrap();
        let x: Vec<f64> = (0..40).map(|i| (i as f64 * 0.3).sin()).collect();
        let fixed = Pentadiagonal::default().multiply(&a, &x).unwrap();
        let generic = Serial.multiply(&a, &x).unwrap();
        for (f, g) in fixed.iter().zip(&generic) {
            assert_relative_eq!(*f, *g, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_fixed_band_name_carries_diagonal_count() {
        assert_eq!(MatVec::<f64>::name(&Pentadiagonal::default()), "fixed-band-5");
        assert_eq!(MatVec::<f64>::name(&Stencil27::default()), "fixed-band-27");
        assert_eq!(MatVec::<f32>::name(&MatVecKind::InnerParallel), "inner-parallel");
    }

    #[test]
    fn test_fixed_band_rejects_other_counts() {
        let a = UcdsMatrix::m_matrix(10, &[-1, 0, 1], &[-1.0, 4.0, -1.0]).unwrap();
        let result = Stencil27::default().multiply(&a, &[0.0; 10]);
        assert!(matches!(result, Err(UcdsError::InvalidArgument(msg)) if msg.contains("27")));
    }

    #[test]
    fn test_kind_dispatch_and_free_functions() {
        let a = UcdsMatrix::m_matrix(5, &[-1, 0, 1], &[-1.0f32, 3.0, -1.0]).unwrap();
        let x = [1.0f32, 1.0, 1.0, 1.0, 1.0];
        let expected = vec![2.0f32, 1.0, 1.0, 1.0, 2.0];
        for kind in MatVecKind::ALL {
            assert_eq!(kind.multiply(&a, &x).unwrap(), expected);
        }
        let mut y = vec![0.0f32; 5];
        multiply(&a, &x, &mut y).unwrap();
        assert_eq!(y, expected);
        multiply_outer(&a, &x, &mut y).unwrap();
        assert_eq!(y, expected);
        multiply_inner(&a, &x, &mut y).unwrap();
        assert_eq!(y, expected);
        a.spmv(&x, &mut y).unwrap();
        assert_eq!(y, expected);
    }
}
