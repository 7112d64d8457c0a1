// Data-parallel vector primitives used by the iterative solver.
// Every function checks operand lengths and returns `InvalidArgument` on a mismatch.
// Elementwise operations have no cross-element dependency and split freely across workers.

use crate::error::{check_len, Result};
use crate::traits::Scalar;
use rayon::prelude::*;

/// Below this many elements per task rayon keeps the work on one thread.
const PAR_MIN_LEN: usize = 4096;

/// Dot product `x . y`.
pub fn dot<T: Scalar>(x: &[T], y: &[T]) -> Result<T> {
    check_len("Right operand y", y.len(), x.len())?;
    Ok(x.par_iter()
        .with_min_len(PAR_MIN_LEN)
        .zip(y.par_iter())
        .map(|(&a, &b)| a * b)
        .sum())
}

/// Dot product of a vector with itself.
pub fn self_dot<T: Scalar>(x: &[T]) -> T {
    x.par_iter()
        .with_min_len(PAR_MIN_LEN)
        .map(|&a| a * a)
        .sum()
}

/// `out = a * x`.
pub fn scale<T: Scalar>(a: T, x: &[T], out: &mut [T]) -> Result<()> {
    check_len("Output vector", out.len(), x.len())?;
    out.par_iter_mut()
        .with_min_len(PAR_MIN_LEN)
        .zip(x.par_iter())
        .for_each(|(o, &v)| *o = a * v);
    Ok(())
}

/// `out = x + y`.
pub fn add<T: Scalar>(x: &[T], y: &[T], out: &mut [T]) -> Result<()> {
    zip_into(x, y, out, |a, b| a + b)
}

/// `out = x - y`.
pub fn sub<T: Scalar>(x: &[T], y: &[T], out: &mut [T]) -> Result<()> {
    zip_into(x, y, out, |a, b| a - b)
}

/// `dest += c * src`, updating `dest` in place.
pub fn axpy_inplace<T: Scalar>(dest: &mut [T], c: T, src: &[T]) -> Result<()> {
    check_len("Source vector", src.len(), dest.len())?;
    dest.par_iter_mut()
        .with_min_len(PAR_MIN_LEN)
        .zip(src.par_iter())
        .for_each(|(d, &s)| *d = *d + c * s);
    Ok(())
}

/// `dest = cx * x + cy * y`.
pub fn combine<T: Scalar>(dest: &mut [T], x: &[T], cx: T, y: &[T], cy: T) -> Result<()> {
    zip_into(x, y, dest, |a, b| cx * a + cy * b)
}

/// Sets every element of `x` to `value`.
pub fn fill<T: Scalar>(x: &mut [T], value: T) {
    x.par_iter_mut()
        .with_min_len(PAR_MIN_LEN)
        .for_each(|v| *v = value);
}

/// Copies `src` into `dest`.
pub fn copy<T: Scalar>(dest: &mut [T], src: &[T]) -> Result<()> {
    check_len("Source vector", src.len(), dest.len())?;
    dest.copy_from_slice(src);
    Ok(())
}

/// A vector of `len` values drawn uniformly from `[0, 1)`.
/// The same seed always produces the same vector.
pub fn random_vector<T: Scalar>(len: usize, seed: u64) -> Vec<T> {
    let mut x = vec![T::zero(); len];
    fill_random(&mut x, seed);
    x
}

/// Overwrites `x` with seeded uniform values in `[0, 1)`.
pub fn fill_random<T: Scalar>(x: &mut [T], seed: u64) {
    let mut rng = fastrand::Rng::with_seed(seed);
    for v in x.iter_mut() {
        *v = num_traits::cast(rng.f64()).unwrap_or_else(T::zero);
    }
}

fn zip_into<T, F>(x: &[T], y: &[T], out: &mut [T], op: F) -> Result<()>
where
    T: Scalar,
    F: Fn(T, T) -> T + Sync + Send,
{
    check_len("Right operand y", y.len(), x.len())?;
    check_len("Output vector", out.len(), x.len())?;
    out.par_iter_mut()
        .with_min_len(PAR_MIN_LEN)
        .zip(x.par_iter().zip(y.par_iter()))
        .for_each(|(o, (&a, &b))| *o = op(a, b));
    Ok(())
}
