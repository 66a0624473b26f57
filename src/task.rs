//! Task lifecycle over caller-owned buffers
//!
//! A [`CannonTask`] borrows input A, input B and a pre-allocated output
//! buffer and walks through four stages in a fixed order:
//!
//! 1. [`validation`](CannonTask::validation): element counts agree and the
//!    geometry is acceptable under the configured policy
//! 2. [`pre_processing`](CannonTask::pre_processing): inputs copied into the
//!    engine, accumulator zeroed
//! 3. [`run`](CannonTask::run): skew plus `num_blocks` rounds
//! 4. [`post_processing`](CannonTask::post_processing): product copied out
//!
//! A failed validation leaves the task in `Created` and allocates nothing.
//!
//! # Example
//!
//! ```
//! use trueno_cannon::CannonTask;
//!
//! let a = vec![1.0; 16];
//! let b = vec![1.0; 16];
//! let mut c = vec![0.0; 16];
//!
//! let mut task = CannonTask::new(&a, &b, &mut c);
//! task.validation().unwrap();
//! task.pre_processing().unwrap();
//! task.run().unwrap();
//! task.post_processing().unwrap();
//! drop(task);
//!
//! assert!(c.iter().all(|&x| x == 4.0));
//! ```

use std::fmt;

use crate::config::CannonConfig;
use crate::engine::CannonEngine;
use crate::geometry::BlockGeometry;
use crate::{CannonError, Result};

/// Lifecycle stage of a [`CannonTask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Constructed, not yet validated
    Created,
    /// Inputs and output checked
    Validated,
    /// Engine loaded
    PreProcessed,
    /// Product computed
    Ran,
    /// Product copied to the output buffer
    PostProcessed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Created => "created",
            Stage::Validated => "validated",
            Stage::PreProcessed => "pre-processed",
            Stage::Ran => "ran",
            Stage::PostProcessed => "post-processed",
        };
        f.write_str(name)
    }
}

/// One multiplication `output = a x b` over borrowed buffers
#[derive(Debug)]
pub struct CannonTask<'a> {
    a: &'a [f64],
    b: &'a [f64],
    output: &'a mut [f64],
    config: CannonConfig,
    geometry: Option<BlockGeometry>,
    engine: Option<CannonEngine>,
    stage: Stage,
}

impl<'a> CannonTask<'a> {
    /// New task with the default configuration
    pub fn new(a: &'a [f64], b: &'a [f64], output: &'a mut [f64]) -> Self {
        Self {
            a,
            b,
            output,
            config: CannonConfig::default(),
            geometry: None,
            engine: None,
            stage: Stage::Created,
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: CannonConfig) -> Self {
        self.config = config;
        self
    }

    /// Current stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Geometry resolved by validation
    pub fn geometry(&self) -> Option<&BlockGeometry> {
        self.geometry.as_ref()
    }

    fn expect_stage(&self, expected: Stage) -> Result<()> {
        if self.stage != expected {
            return Err(CannonError::InvalidStage {
                expected,
                found: self.stage,
            });
        }
        Ok(())
    }

    fn check(&self) -> Result<BlockGeometry> {
        let count = self.a.len();
        for actual in [self.b.len(), self.output.len()] {
            if actual != count {
                return Err(CannonError::SizeMismatch {
                    expected: count,
                    actual,
                });
            }
        }
        BlockGeometry::resolve_with(count, self.config.geometry_policy)
    }

    /// Boolean form of [`CannonTask::validation`] without a stage change
    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    /// Checks element counts and geometry
    ///
    /// # Errors
    ///
    /// - `InvalidStage` unless the task is `Created`
    /// - `SizeMismatch` if `count(b) != count(a)` or `count(output) != count(a)`
    /// - any geometry error for the configured policy
    pub fn validation(&mut self) -> Result<()> {
        self.expect_stage(Stage::Created)?;
        self.geometry = Some(self.check()?);
        self.stage = Stage::Validated;
        Ok(())
    }

    /// Copies the inputs into a fresh engine
    ///
    /// # Errors
    ///
    /// - `InvalidStage` unless the task is `Validated`
    /// - `InvalidInput` for a zero worker cap
    pub fn pre_processing(&mut self) -> Result<()> {
        self.expect_stage(Stage::Validated)?;
        let geometry = self.geometry.ok_or(CannonError::InvalidStage {
            expected: Stage::Validated,
            found: self.stage,
        })?;
        let engine =
            CannonEngine::with_partitioner(geometry, self.a, self.b, self.config.partitioner()?)?
                .with_elide_final_shift(self.config.elide_final_shift);
        self.engine = Some(engine);
        self.stage = Stage::PreProcessed;
        Ok(())
    }

    /// Runs the skew and all rounds
    ///
    /// # Errors
    ///
    /// Returns `InvalidStage` unless the task is `PreProcessed`.
    pub fn run(&mut self) -> Result<()> {
        self.expect_stage(Stage::PreProcessed)?;
        let engine = self.engine.as_mut().ok_or(CannonError::InvalidStage {
            expected: Stage::PreProcessed,
            found: self.stage,
        })?;
        engine.run()?;
        self.stage = Stage::Ran;
        Ok(())
    }

    /// Copies the product into the output buffer and releases the engine
    ///
    /// Under `GeometryPolicy::Truncate` the product fills the leading `N * N`
    /// elements and every element past them is set to zero.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStage` unless the task is `Ran`.
    pub fn post_processing(&mut self) -> Result<()> {
        self.expect_stage(Stage::Ran)?;
        let engine = self.engine.take().ok_or(CannonError::InvalidStage {
            expected: Stage::Ran,
            found: self.stage,
        })?;
        let len = engine.output().len();
        let (product, tail) = self.output.split_at_mut(len);
        engine.write_output(product)?;
        tail.fill(0.0);
        self.stage = Stage::PostProcessed;
        Ok(())
    }

    /// All four stages in order
    ///
    /// # Errors
    ///
    /// Propagates the first failing stage.
    pub fn execute(&mut self) -> Result<()> {
        self.validation()?;
        self.pre_processing()?;
        self.run()?;
        self.post_processing()
    }
}
