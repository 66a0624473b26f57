//! Trueno Cannon: blocked, data-local parallel matrix multiplication
//!
//! Computes `C = A x B` for square `f64` matrices with Cannon's algorithm:
//!
//! 1. **Geometry**: `N x N` is tiled into `num_blocks x num_blocks` square
//!    blocks of side `block_size`
//! 2. **Skew**: block-row `i` of A rotates left by `i`, block-column `j` of B
//!    rotates up by `j`
//! 3. **Rounds**: `num_blocks` times, every co-located block pair is
//!    multiplied into C, then A shifts one block left and B one block up
//!
//! Every phase splits the block-rows into disjoint ranges, one per worker,
//! so the accumulator needs no locks; workers are joined between phases.
//! The execution backend (sequential, scoped threads, rayon) is pluggable
//! through the [`Partitioner`] trait.
//!
//! # Quick Start
//!
//! ```rust
//! use trueno_cannon::cannon_matmul;
//!
//! let a: Vec<f64> = (1..=16).map(f64::from).collect();
//! let b = vec![
//!     1.0, 0.0, 0.0, 1.0,
//!     0.0, 1.0, 1.0, 0.0,
//!     1.0, 0.0, 0.0, 1.0,
//!     0.0, 1.0, 1.0, 0.0,
//! ];
//! let mut c = vec![0.0; 16];
//!
//! cannon_matmul(&a, &b, &mut c).unwrap();
//! assert_eq!(&c[..4], &[4.0, 6.0, 6.0, 4.0]);
//! ```
//!
//! # Features
//!
//! - `parallel` (default): rayon backend, used by `BackendKind::Auto`
//! - `tracing` (default): spans for every phase and engine state transitions

mod align;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod matrix;
mod multiply;
pub mod partition;
pub mod perf;
mod rotate;
mod skew;
pub mod task;

pub use config::{BackendKind, CannonConfig};
pub use engine::{CannonEngine, EngineState};
pub use error::{CannonError, Result};
pub use geometry::{BlockGeometry, GeometryPolicy};
pub use matrix::SquareMatrix;
pub use partition::{ParallelBackend, Partitioner};
pub use task::{CannonTask, Stage};

/// Multiplies `a x b` into `output` with the default configuration
///
/// All three buffers must hold the same number of elements, `N * N`, where
/// `N` tiles exactly into square blocks.
///
/// # Errors
///
/// - `SizeMismatch` if the element counts differ
/// - `NotSquare` / `InexactGeometry` for unsupported sizes
/// - `EmptyMatrix` for empty buffers
pub fn cannon_matmul(a: &[f64], b: &[f64], output: &mut [f64]) -> Result<()> {
    CannonTask::new(a, b, output).execute()
}
