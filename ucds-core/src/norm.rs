//! Vector norms.
//!
//! Two interchangeable implementations are provided: [`IterativeNorm`]
//! reduces the whole vector with one flat parallel reduction, and
//! [`RecursiveNorm`] splits the vector at its midpoint, computes both halves
//! concurrently and combines the partial norms. Both agree within floating
//! point tolerance.

use crate::traits::{Scalar, VectorNorm};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Below this length a flat reduction runs on the calling thread.
const PAR_MIN_LEN: usize = 4096;

/// Below this length the recursive norm keeps splitting without forking.
const FORK_MIN_LEN: usize = 8192;

/// The norm measured by [`VectorNorm::norm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NormMode {
    /// Sum of absolute values.
    L1,
    /// Square root of the sum of squares.
    #[default]
    L2,
    /// Maximum absolute value.
    Linf,
}

/// Integer mode codes: `1` is L1, `2` is L2 and anything else is the infinity norm.
impl From<i32> for NormMode {
    fn from(code: i32) -> Self {
        match code {
            1 => NormMode::L1,
            2 => NormMode::L2,
            _ => NormMode::Linf,
        }
    }
}

/// Flat parallel reduction over the whole vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterativeNorm;

impl<T: Scalar> VectorNorm<T> for IterativeNorm {
    fn name(&self) -> &'static str {
        "iterative"
    }

    fn norm(&self, x: &[T], mode: NormMode) -> T {
        let abs = x.par_iter().with_min_len(PAR_MIN_LEN).map(|v| v.abs());
        match mode {
            NormMode::L1 => abs.sum(),
            NormMode::L2 => abs.map(|v| v * v).sum::<T>().sqrt(),
            NormMode::Linf => abs.reduce(T::zero, T::max),
        }
    }
}

/// Divide-and-conquer reduction: split at the midpoint, recurse on both
/// halves (concurrently for long vectors), then combine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursiveNorm;

impl RecursiveNorm {
    fn reduce<T: Scalar>(x: &[T], mode: NormMode) -> T {
        match x.len() {
            0 => T::zero(),
            1 => x[0].abs(),
            len => {
                let (left, right) = x.split_at(len / 2);
                let (a, b) = if len >= FORK_MIN_LEN {
                    rayon::join(|| Self::reduce(left, mode), || Self::reduce(right, mode))
                } else {
                    (Self::reduce(left, mode), Self::reduce(right, mode))
                };
                match mode {
                    NormMode::L1 => a + b,
                    NormMode::L2 => a.hypot(b),
                    NormMode::Linf => a.max(b),
                }
            }
        }
    }
}

impl<T: Scalar> VectorNorm<T> for RecursiveNorm {
    fn name(&self) -> &'static str {
        "recursive"
    }

    fn norm(&self, x: &[T], mode: NormMode) -> T {
        Self::reduce(x, mode)
    }
}

/// Serializable selector for a norm strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormKind {
    #[default]
    Iterative,
    Recursive,
}

impl<T: Scalar> VectorNorm<T> for NormKind {
    fn name(&self) -> &'static str {
        match self {
            NormKind::Iterative => VectorNorm::<T>::name(&IterativeNorm),
            NormKind::Recursive => VectorNorm::<T>::name(&RecursiveNorm),
        }
    }

    fn norm(&self, x: &[T], mode: NormMode) -> T {
        match self {
            NormKind::Iterative => IterativeNorm.norm(x, mode),
            NormKind::Recursive => RecursiveNorm.norm(x, mode),
        }
    }
}

/// Norm of `x` using the flat reduction.
pub fn norm<T: Scalar>(x: &[T], mode: NormMode) -> T {
    IterativeNorm.norm(x, mode)
}

/// Norm of `x` using the divide-and-conquer reduction.
pub fn norm_recursive<T: Scalar>(x: &[T], mode: NormMode) -> T {
    RecursiveNorm.norm(x, mode)
}
