use std::time::Instant;
use ucds_lsolver::{
    algorithms::{ConjugateGradient, SolveAlgorithm},
    CpuDevice, MatVecKind, NormKind, UcdsMatrix,
};

/// Creates a pentadiagonal M-matrix A of size n x n.
/// Diagonals:
/// - Main: 4.0
/// - Adjacent (+1, -1): -1.0
/// - Outer (+2, -2): -0.5
fn create_pentadiagonal_matrix(n: usize) -> UcdsMatrix<f64> {
    UcdsMatrix::m_matrix(n, &[-2, -1, 0, 1, 2], &[-0.5, -1.0, 4.0, -1.0, -0.5])
        .expect("Failed to build pentadiagonal matrix")
}

/// Creates a vector b of size n with b[i] = sin(i / n).
fn create_sin_vector(n: usize) -> Vec<f64> {
    (0..n).map(|i| (i as f64 / n as f64).sin()).collect()
}

fn main() {
    // Initialize logging based on RUST_LOG environment variable
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let n = 1_000_000;
    log::info!(
        "Setting up {}x{} pentadiagonal matrix A and sin vector b...",
        n,
        n
    );
    let a = create_pentadiagonal_matrix(n);
    let b = create_sin_vector(n);
    let device = CpuDevice::new();
    log::info!("Worker threads: {}", device.num_threads());

    for kernel in MatVecKind::ALL {
        let algorithm = ConjugateGradient {
            tolerance: 1e-8,
            kernel,
            norm: NormKind::Recursive,
            ..ConjugateGradient::new()
        };

        let start_time = Instant::now();
        let x_result = algorithm.solve(&device, &a, &b, None);
        let duration = start_time.elapsed();

        match x_result {
            Ok(result) => {
                log::info!("{:?} finished successfully!", kernel);
                log::info!("  Iterations: {}", result.metadata.iterations);
                log::info!(
                    "  Final Residual Norm: {:.6e}",
                    result.metadata.residual_norm
                );
                log::info!("  Recomputations: {}", result.metadata.recomputations);
                log::info!("  Time elapsed: {:?}", duration);
            }
            Err(e) => {
                log::error!("{:?} failed: {}", kernel, e);
            }
        }
    }
}
