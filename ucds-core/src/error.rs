use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UcdsError {
    #[error("Invalid matrix dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Invalid diagonal offsets: {0}")]
    InvalidOffsets(String),

    /// The M-matrix dominance surrogate (sum of diagonal values >= 0) failed.
    #[error("Diagonal dominance check failed: {0}")]
    InvalidDominance(String),

    /// Wrongly sized buffers or parameters handed to a kernel, vector op or solver.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

pub type Result<T> = core::result::Result<T, UcdsError>;

/// Checks that `actual` equals `expected`, naming the buffer in the error.
pub(crate) fn check_len(what: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(UcdsError::InvalidArgument(format!(
            "{} length ({}) does not match expected length ({})",
            what, actual, expected
        )));
    }
    Ok(())
}
