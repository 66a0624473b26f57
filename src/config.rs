//! Engine configuration
//!
//! # Examples
//!
//! ```
//! use trueno_cannon::config::{BackendKind, CannonConfig};
//! use trueno_cannon::geometry::GeometryPolicy;
//!
//! let config = CannonConfig::new()
//!     .with_backend(BackendKind::Threads)
//!     .with_workers(4)
//!     .with_geometry_policy(GeometryPolicy::Truncate)
//!     .with_elide_final_shift(true);
//!
//! assert_eq!(config.workers, Some(4));
//! ```

use crate::geometry::GeometryPolicy;
use crate::partition::ParallelBackend;
use crate::Result;

/// Which parallel backend executes the phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Rayon when the `parallel` feature is enabled, scoped threads otherwise
    #[default]
    Auto,
    /// Everything on the calling thread
    Sequential,
    /// Fresh scoped OS threads per phase
    Threads,
    /// Rayon global pool
    Rayon,
}

/// Configuration for one Cannon multiplication
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CannonConfig {
    /// Parallel backend
    pub backend: BackendKind,
    /// Worker cap per phase (`None` = hardware parallelism)
    pub workers: Option<usize>,
    /// Treatment of sides the block grid cannot tile
    pub geometry_policy: GeometryPolicy,
    /// Skip the rotation after the last round
    pub elide_final_shift: bool,
}

impl CannonConfig {
    /// Default configuration: auto backend, all cores, strict geometry
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-threaded configuration
    pub fn sequential() -> Self {
        Self::new().with_backend(BackendKind::Sequential)
    }

    /// Set the parallel backend
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Cap the number of workers per phase
    ///
    /// Zero is accepted here and rejected when the backend is built.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set the geometry policy
    pub fn with_geometry_policy(mut self, policy: GeometryPolicy) -> Self {
        self.geometry_policy = policy;
        self
    }

    /// Skip (or keep) the rotation after the last round
    pub fn with_elide_final_shift(mut self, elide: bool) -> Self {
        self.elide_final_shift = elide;
        self
    }

    /// Builds the backend described by this configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the worker cap is zero.
    pub fn partitioner(&self) -> Result<ParallelBackend> {
        ParallelBackend::select(self.backend, self.workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Partitioner;
    use crate::CannonError;

    #[test]
    fn test_default_config() {
        let config = CannonConfig::default();
        assert_eq!(config.backend, BackendKind::Auto);
        assert_eq!(config.workers, None);
        assert_eq!(config.geometry_policy, GeometryPolicy::Strict);
        assert!(!config.elide_final_shift);
        assert_eq!(config, CannonConfig::new());
    }

    #[test]
    fn test_builder_chain() {
        let config = CannonConfig::new()
            .with_backend(BackendKind::Rayon)
            .with_workers(3)
            .with_geometry_policy(GeometryPolicy::Truncate)
            .with_elide_final_shift(true);
        assert_eq!(config.backend, BackendKind::Rayon);
        assert_eq!(config.workers, Some(3));
        assert_eq!(config.geometry_policy, GeometryPolicy::Truncate);
        assert!(config.elide_final_shift);
    }

    #[test]
    fn test_sequential_preset() {
        let p = CannonConfig::sequential().partitioner().unwrap();
        assert_eq!(p.kind(), BackendKind::Sequential);
        assert_eq!(p.max_workers(), 1);
    }

    #[test]
    fn test_zero_workers_rejected_at_build() {
        let config = CannonConfig::new()
            .with_backend(BackendKind::Threads)
            .with_workers(0);
        assert!(matches!(
            config.partitioner(),
            Err(CannonError::InvalidInput(_))
        ));
    }
}
