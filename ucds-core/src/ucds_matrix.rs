use crate::error::{Result, UcdsError};
use crate::traits::{Matrix, Scalar};
use log::debug;
use rayon::prelude::*;
use std::ops::Range;

/// Represents an `N x N` banded matrix in Ultra Compressed Diagonal Storage (UCDS).
///
/// Only the diagonals named in `offsets` are stored. A diagonal offset is
/// `column - row`. All diagonals share one flat buffer: the block for the
/// `i`-th offset occupies `values[i*N..(i+1)*N]`, and within that block
/// index `j` holds the element in column `j` (row `j - offset`).
///
/// Every block has the full stride `N` even though a diagonal with offset
/// `k` only has `N - |k|` elements. The unused slots are padding: the
/// layout spends up to `|k|` extra values per diagonal so that the element
/// for column `j` is always at `i*N + j`, with no per-diagonal start table.
///
/// For example `[[1, 2], [3, 4]]` is stored as offsets `[-1, 0, 1]` and
/// values `[3, _, 1, 4, _, 2]`.
///
/// The matrix is never mutated by kernels or the solver, so a shared
/// reference can be read from any number of threads at once.
#[derive(Debug, Clone, PartialEq)]
pub struct UcdsMatrix<T> {
    /// Matrix dimension `N`.
    size: usize,
    /// Strictly ascending diagonal offsets in `[1-N, N-1]`.
    offsets: Vec<isize>,
    /// `offsets.len() * size` values, one padded block per diagonal.
    pub(crate) values: Vec<T>,
}

/// Checks the invariants shared by every UCDS constructor.
fn validate_layout(size: usize, offsets: &[isize]) -> Result<()> {
    if size < 1 {
        return Err(UcdsError::InvalidDimensions(
            "Matrix size must be at least 1".to_string(),
        ));
    }
    if offsets.is_empty() {
        return Err(UcdsError::InvalidOffsets(
            "At least one diagonal offset is required".to_string(),
        ));
    }
    let limit = size as isize - 1;
    if let Some(&bad) = offsets.iter().find(|&&o| o < -limit || o > limit) {
        return Err(UcdsError::InvalidOffsets(format!(
            "Offset {} is outside [{}, {}] for a {}x{} matrix",
            bad, -limit, limit, size, size
        )));
    }
    if let Some(pair) = offsets.windows(2).find(|w| w[0] >= w[1]) {
        return Err(UcdsError::InvalidOffsets(format!(
            "Offsets must be strictly ascending, found {} followed by {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

/// Columns `j` for which the diagonal `offset` has an element in an `size x size` matrix.
/// Empty when `|offset| >= size`.
pub(crate) fn stored_columns(size: usize, offset: isize) -> Range<usize> {
    let end = size.saturating_sub((-offset).max(0) as usize);
    let start = (offset.max(0) as usize).min(end);
    start..end
}

impl<T: Scalar> UcdsMatrix<T> {
    /// Creates a zero-filled matrix with the given diagonal layout.
    /// The caller fills the values afterwards (see [`UcdsMatrix::diagonal_mut`]).
    pub fn new(size: usize, offsets: &[isize]) -> Result<Self> {
        validate_layout(size, offsets)?;
        debug!(
            "Creating {}x{} UCDS matrix with {} diagonals",
            size,
            size,
            offsets.len()
        );
        Ok(Self {
            size,
            offsets: offsets.to_vec(),
            values: vec![T::zero(); offsets.len() * size],
        })
    }

    /// Creates a matrix from a complete value buffer laid out block per diagonal.
    pub fn from_diagonals(size: usize, offsets: &[isize], values: Vec<T>) -> Result<Self> {
        validate_layout(size, offsets)?;
        if values.len() != offsets.len() * size {
            return Err(UcdsError::InvalidDimensions(format!(
                "Value buffer length ({}) must equal diagonals ({}) x size ({})",
                values.len(),
                offsets.len(),
                size
            )));
        }
        Ok(Self {
            size,
            offsets: offsets.to_vec(),
            values,
        })
    }

    /// Builds a sample M-matrix: every stored diagonal is filled uniformly with
    /// the corresponding entry of `diag_values`.
    ///
    /// Besides the usual layout checks, the offsets must bracket zero
    /// (`min <= 0 <= max`) and the diagonal values must sum to a non-negative
    /// number. The sum test only approximates diagonal dominance: it is
    /// necessary for an interior row to be dominant, but it is not checked
    /// row by row and does not look at the signs of the off-diagonal values.
    pub fn m_matrix(size: usize, offsets: &[isize], diag_values: &[T]) -> Result<Self> {
        if offsets.len() != diag_values.len() {
            return Err(UcdsError::InvalidArgument(format!(
                "Number of offsets ({}) must match number of diagonal values ({})",
                offsets.len(),
                diag_values.len()
            )));
        }
        validate_layout(size, offsets)?;

        let (first, last) = (offsets[0], offsets[offsets.len() - 1]);
        if first > 0 || last < 0 {
            return Err(UcdsError::InvalidOffsets(format!(
                "M-matrix offsets must bracket the main diagonal, got [{}, {}]",
                first, last
            )));
        }
        let sum: T = diag_values.iter().copied().sum();
        if !(sum >= T::zero()) {
            return Err(UcdsError::InvalidDominance(format!(
                "Sum of diagonal values ({}) must be non-negative",
                sum
            )));
        }

        let mut matrix = Self::new(size, offsets)?;
        matrix
            .values
            .par_chunks_mut(size)
            .zip(diag_values.par_iter())
            .for_each(|(block, &value)| block.fill(value));
        Ok(matrix)
    }

    /// Creates a matrix from a dense square representation, storing every
    /// diagonal that holds at least one non-zero. An all-zero input keeps
    /// the main diagonal so the layout is never empty.
    pub fn from_dense(dense: &[Vec<T>]) -> Result<Self> {
        let size = dense.len();
        if let Some(row) = dense.iter().find(|row| row.len() != size) {
            return Err(UcdsError::InvalidDimensions(format!(
                "Dense input must be square: found a row of length {} in a {}-row matrix",
                row.len(),
                size
            )));
        }
        let mut offsets: Vec<isize> = (1 - size as isize..size as isize)
            .filter(|&k| {
                stored_columns(size, k).any(|col| dense[(col as isize - k) as usize][col] != T::zero())
            })
            .collect();
        if offsets.is_empty() && size > 0 {
            offsets.push(0);
        }

        let mut matrix = Self::new(size, &offsets)?;
        for (row, row_vec) in dense.iter().enumerate() {
            for (col, &value) in row_vec.iter().enumerate() {
                if value != T::zero() {
                    matrix.set(row, col, value)?;
                }
            }
        }
        Ok(matrix)
    }

    /// Releases the matrix. Equivalent to dropping it.
    pub fn destroy(self) {
        debug!("Destroying {}x{} UCDS matrix", self.size, self.size);
    }

    /// Matrix dimension `N`.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of stored diagonals.
    pub fn num_diagonals(&self) -> usize {
        self.offsets.len()
    }

    /// Stored diagonal offsets in ascending order.
    pub fn offsets(&self) -> &[isize] {
        &self.offsets
    }

    /// The full value buffer, including padding.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Mutable access to the full value buffer, including padding.
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Position of `offset` among the stored diagonals.
    pub fn diagonal_index(&self, offset: isize) -> Option<usize> {
        self.offsets.binary_search(&offset).ok()
    }

    /// Columns holding real (non-padding) elements of the diagonal `offset`.
    pub fn column_range(&self, offset: isize) -> Range<usize> {
        stored_columns(self.size, offset)
    }

    /// The padded block of the diagonal at position `index`.
    pub(crate) fn block(&self, index: usize) -> &[T] {
        &self.values[index * self.size..(index + 1) * self.size]
    }

    /// The padded block of diagonal `offset`, indexed by column.
    pub fn diagonal(&self, offset: isize) -> Option<&[T]> {
        self.diagonal_index(offset).map(|i| self.block(i))
    }

    /// Mutable padded block of diagonal `offset`, indexed by column.
    pub fn diagonal_mut(&mut self, offset: isize) -> Option<&mut [T]> {
        let n = self.size;
        self.diagonal_index(offset)
            .map(move |i| &mut self.values[i * n..(i + 1) * n])
    }

    /// Gets the value at `(row, col)`.
    /// Returns `None` if the indices are out of bounds or the diagonal is not stored.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.size || col >= self.size {
            return None;
        }
        let offset = col as isize - row as isize;
        self.diagonal(offset).map(|block| block[col])
    }

    /// Sets the value at `(row, col)`. The diagonal must be stored.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let size = self.size;
        if row >= size || col >= size {
            return Err(UcdsError::InvalidArgument(format!(
                "Index ({}, {}) is out of bounds for a {}x{} matrix",
                row, col, size, size
            )));
        }
        let offset = col as isize - row as isize;
        match self.diagonal_mut(offset) {
            Some(block) => {
                block[col] = value;
                Ok(())
            }
            None => Err(UcdsError::InvalidOffsets(format!(
                "Diagonal {} is not stored in this matrix",
                offset
            ))),
        }
    }

    /// Checks `A == A^T` on the stored elements. Every stored diagonal `k`
    /// needs a stored partner `-k` holding the mirrored values.
    pub fn is_symmetric(&self) -> bool {
        self.offsets.iter().enumerate().all(|(i, &k)| {
            let Some(mirror) = self.diagonal(-k) else {
                return false;
            };
            let block = self.block(i);
            // A[j-k][j] is mirrored by A[j][j-k], which sits in column j-k of diagonal -k.
            self.column_range(k)
                .all(|j| block[j] == mirror[(j as isize - k) as usize])
        })
    }

    /// Expands the matrix to a dense row-major representation.
    pub fn to_dense(&self) -> Vec<Vec<T>> {
        let mut dense = vec![vec![T::zero(); self.size]; self.size];
        for (i, &k) in self.offsets.iter().enumerate() {
            let block = self.block(i);
            for j in self.column_range(k) {
                dense[(j as isize - k) as usize][j] = block[j];
            }
        }
        dense
    }
}

impl<T: Scalar> Matrix for UcdsMatrix<T> {
    type Value = T;

    fn dims(&self) -> (usize, usize) {
        (self.size, self.size)
    }
}

/// Creates a zero-filled UCDS matrix. See [`UcdsMatrix::new`].
pub fn create_matrix<T: Scalar>(size: usize, offsets: &[isize]) -> Result<UcdsMatrix<T>> {
    UcdsMatrix::new(size, offsets)
}

/// Builds a uniformly filled M-matrix. See [`UcdsMatrix::m_matrix`].
pub fn build_m_matrix<T: Scalar>(
    size: usize,
    offsets: &[isize],
    diag_values: &[T],
) -> Result<UcdsMatrix<T>> {
    UcdsMatrix::m_matrix(size, offsets, diag_values)
}

/// Releases a UCDS matrix.
pub fn destroy_matrix<T: Scalar>(matrix: UcdsMatrix<T>) {
    matrix.destroy();
}

#[cfg(test)]
mod tests {
    use crate::{Matrix, UcdsError, UcdsMatrix};

    #[test]
    fn test_ucds_matrix_new() {
        let matrix: UcdsMatrix<f64> = UcdsMatrix::new(4, &[-1, 0, 2]).unwrap();
        assert_eq!(matrix.dims(), (4, 4));
        assert_eq!(matrix.num_diagonals(), 3);
        assert_eq!(matrix.values().len(), 12);
        assert!(matrix.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_ucds_matrix_rejects_zero_size() {
        let matrix = UcdsMatrix::<f64>::new(0, &[0]);
        match matrix.err().unwrap() {
            UcdsError::InvalidDimensions(msg) => assert!(msg.contains("at least 1")),
            other => panic!("Expected InvalidDimensions error, got {:?}", other),
        }
    }

    #[test]
    fn test_ucds_matrix_rejects_bad_offsets() {
        let unsorted = UcdsMatrix::<f64>::new(5, &[0, -1, 1]);
        assert!(matches!(unsorted, Err(UcdsError::InvalidOffsets(msg)) if msg.contains("ascending")));

        let repeated = UcdsMatrix::<f64>::new(5, &[-1, 0, 0, 1]);
        assert!(matches!(repeated, Err(UcdsError::InvalidOffsets(_))));

        let too_low = UcdsMatrix::<f64>::new(3, &[-3, 0]);
        assert!(matches!(too_low, Err(UcdsError::InvalidOffsets(msg)) if msg.contains("outside")));

        let too_high = UcdsMatrix::<f64>::new(3, &[0, 3]);
        assert!(matches!(too_high, Err(UcdsError::InvalidOffsets(_))));

        let empty = UcdsMatrix::<f64>::new(3, &[]);
        assert!(matches!(empty, Err(UcdsError::InvalidOffsets(_))));

        // Extreme offsets are still valid.
        assert!(UcdsMatrix::<f64>::new(3, &[-2, 2]).is_ok());
        assert!(UcdsMatrix::<f64>::new(1, &[0]).is_ok());
    }

    #[test]
    fn test_ucds_matrix_from_diagonals_checks_length() {
        let matrix = UcdsMatrix::from_diagonals(2, &[-1, 0, 1], vec![3.0, 0.0, 1.0, 4.0]);
        assert!(matches!(matrix, Err(UcdsError::InvalidDimensions(_))));
    }

    #[test]
    fn test_ucds_matrix_get() {
        // [ 1 2 ]
        // [ 3 4 ]
        let matrix =
            UcdsMatrix::from_diagonals(2, &[-1, 0, 1], vec![3.0, -9.0, 1.0, 4.0, -9.0, 2.0])
                .unwrap();

        assert_eq!(matrix.get(0, 0), Some(1.0));
        assert_eq!(matrix.get(0, 1), Some(2.0));
        assert_eq!(matrix.get(1, 0), Some(3.0));
        assert_eq!(matrix.get(1, 1), Some(4.0));
        assert_eq!(matrix.get(2, 0), None);
        assert_eq!(matrix.to_dense(), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_ucds_matrix_set_requires_stored_diagonal() {
        let mut matrix = UcdsMatrix::<f32>::new(3, &[0]).unwrap();
        matrix.set(1, 1, 5.0).unwrap();
        assert_eq!(matrix.get(1, 1), Some(5.0));
        assert_eq!(matrix.get(0, 1), None);
        assert!(matches!(
            matrix.set(0, 1, 1.0),
            Err(UcdsError::InvalidOffsets(_))
        ));
        assert!(matches!(
            matrix.set(3, 0, 1.0),
            Err(UcdsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_column_range() {
        let matrix = UcdsMatrix::<f64>::new(5, &[-2, 0, 3]).unwrap();
        assert_eq!(matrix.column_range(-2), 0..3);
        assert_eq!(matrix.column_range(0), 0..5);
        assert_eq!(matrix.column_range(3), 3..5);
    }

    #[test]
    fn test_column_range_outside_band_is_empty() {
        let matrix = UcdsMatrix::<f64>::new(5, &[0]).unwrap();
        assert!(matrix.column_range(-10).is_empty());
        assert!(matrix.column_range(-5).is_empty());
        assert!(matrix.column_range(5).is_empty());
        assert!(matrix.column_range(isize::MAX).is_empty());
        assert_eq!(matrix.column_range(-4), 0..1);
        assert_eq!(matrix.column_range(4), 4..5);
    }

    #[test]
    fn test_m_matrix_fills_diagonals() {
        let matrix = UcdsMatrix::m_matrix(2, &[-1, 0, 1], &[-1.0, 4.0, -1.0]).unwrap();
        assert_eq!(matrix.to_dense(), vec![vec![4.0, -1.0], vec![-1.0, 4.0]]);
        assert!(matrix.is_symmetric());
    }

    #[test]
    fn test_m_matrix_rejects_unbracketed_offsets() {
        let above = UcdsMatrix::m_matrix(4, &[1, 2], &[1.0, 1.0]);
        assert!(matches!(above, Err(UcdsError::InvalidOffsets(msg)) if msg.contains("bracket")));
        let below = UcdsMatrix::m_matrix(4, &[-2, -1], &[1.0, 1.0]);
        assert!(matches!(below, Err(UcdsError::InvalidOffsets(_))));
        // Zero need not be stored, only bracketed.
        assert!(UcdsMatrix::m_matrix(4, &[-1, 1], &[1.0, 1.0]).is_ok());
    }

    #[test]
    fn test_m_matrix_rejects_negative_dominance_sum() {
        let matrix = UcdsMatrix::m_matrix(4, &[-1, 0, 1], &[-3.0, 4.0, -3.0]);
        assert!(matches!(matrix, Err(UcdsError::InvalidDominance(_))));
        let nan = UcdsMatrix::m_matrix(4, &[0], &[f64::NAN]);
        assert!(matches!(nan, Err(UcdsError::InvalidDominance(_))));
    }

    #[test]
    fn test_m_matrix_rejects_mismatched_values() {
        let matrix = UcdsMatrix::m_matrix(4, &[-1, 0, 1], &[4.0, -1.0]);
        assert!(matches!(matrix, Err(UcdsError::InvalidArgument(_))));
    }

    #[test]
    fn test_from_dense_round_trip() {
        let dense = vec![
            vec![4.0, -1.0, 0.0, 0.0],
            vec![-1.0, 4.0, -1.0, 0.0],
            vec![0.0, -1.0, 4.0, 0.0],
            vec![2.0, 0.0, -1.0, 4.0],
        ];
        let matrix = UcdsMatrix::from_dense(&dense).unwrap();
        assert_eq!(matrix.offsets(), &[-3, -1, 0, 1]);
        assert_eq!(matrix.to_dense(), dense);
        assert!(!matrix.is_symmetric());
    }

    #[test]
    fn test_from_dense_rejects_ragged_rows() {
        let dense = vec![vec![1.0, 0.0], vec![0.0]];
        assert!(matches!(
            UcdsMatrix::from_dense(&dense),
            Err(UcdsError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_symmetry_ignores_padding() {
        let mut matrix = UcdsMatrix::m_matrix(3, &[-1, 0, 1], &[-1.0, 3.0, -1.0]).unwrap();
        // Column 2 of diagonal -1 and column 0 of diagonal 1 are padding.
        matrix.diagonal_mut(-1).unwrap()[2] = 99.0;
        matrix.diagonal_mut(1).unwrap()[0] = -42.0;
        assert!(matrix.is_symmetric());
        matrix.set(0, 1, 7.0).unwrap();
        assert!(!matrix.is_symmetric());
    }
}
