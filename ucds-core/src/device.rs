use crate::error::{Result, UcdsError};
use std::sync::Arc;

/// Marker trait for execution devices.
pub trait Device: std::fmt::Debug {}

/// Represents the CPU execution device.
///
/// Kernels and vector operations use rayon. By default they run on rayon's
/// global pool; a device built with [`CpuDevice::with_threads`] owns a
/// dedicated pool instead, and work submitted through [`CpuDevice::install`]
/// runs there.
#[derive(Debug, Clone, Default)]
pub struct CpuDevice {
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Device for CpuDevice {}

impl CpuDevice {
    /// Creates a device backed by rayon's global thread pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a device with a dedicated pool of `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(UcdsError::InvalidArgument(
                "Thread count must be at least 1".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("ucds-worker-{}", i))
            .build()
            .map_err(|e| UcdsError::ThreadPool(e.to_string()))?;
        log::info!("CpuDevice created with {} worker threads", threads);
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    /// Number of worker threads available to parallel operations.
    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Runs `op` on this device's pool.
    pub fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}
