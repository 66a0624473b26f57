//! Cannon's algorithm engine
//!
//! [`CannonEngine`] owns working copies of A and B and the zeroed
//! accumulator C for exactly one multiplication. Skew and rotation rewrite
//! the working copies; the caller's buffers are never touched until the
//! result is copied out.
//!
//! # State machine
//!
//! ```text
//! Idle --skew--> Skewed --multiply--> Multiplied(0) --shift--> Shifted(0) --multiply--> ...
//!      ... Multiplied(num_blocks - 1) --shift--> Done
//! ```
//!
//! With `elide_final_shift` the last rotation is skipped and the engine
//! goes straight from `Multiplied(num_blocks - 1)` to `Done`.
//!
//! # Example
//!
//! ```
//! use trueno_cannon::{CannonConfig, CannonEngine};
//!
//! let a = vec![1.0; 16];
//! let b = vec![2.0; 16];
//! let mut engine = CannonEngine::new(&a, &b, &CannonConfig::new()).unwrap();
//! engine.run().unwrap();
//! assert!(engine.output().iter().all(|&x| x == 8.0));
//! ```

use std::fmt;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::CannonConfig;
use crate::geometry::BlockGeometry;
use crate::multiply::multiply_accumulate;
use crate::partition::{ParallelBackend, Partitioner};
use crate::rotate::rotate;
use crate::skew::skew;
use crate::{CannonError, Result};

/// Lifecycle state of a [`CannonEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Buffers loaded, nothing computed
    Idle,
    /// Initial alignment applied
    Skewed,
    /// Block products of `round` accumulated
    Multiplied {
        /// Zero-based round index
        round: usize,
    },
    /// Operands rotated after `round`
    Shifted {
        /// Zero-based round index
        round: usize,
    },
    /// All rounds complete, output ready
    Done,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Idle => write!(f, "idle"),
            EngineState::Skewed => write!(f, "skewed"),
            EngineState::Multiplied { round } => write!(f, "multiplied (round {round})"),
            EngineState::Shifted { round } => write!(f, "shifted (round {round})"),
            EngineState::Done => write!(f, "done"),
        }
    }
}

/// One Cannon multiplication: geometry, working buffers and backend
#[derive(Debug, Clone)]
pub struct CannonEngine<P = ParallelBackend> {
    geometry: BlockGeometry,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    partitioner: P,
    state: EngineState,
    elide_final_shift: bool,
}

impl CannonEngine<ParallelBackend> {
    /// Validates the inputs, resolves the geometry and loads the buffers
    ///
    /// # Errors
    ///
    /// - `SizeMismatch` if `b` and `a` have different lengths
    /// - any geometry error for `config.geometry_policy`
    /// - `InvalidInput` for a zero worker cap
    pub fn new(a: &[f64], b: &[f64], config: &CannonConfig) -> Result<Self> {
        if b.len() != a.len() {
            return Err(CannonError::SizeMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        let geometry = BlockGeometry::resolve_with(a.len(), config.geometry_policy)?;
        let engine = Self::with_partitioner(geometry, a, b, config.partitioner()?)?;
        Ok(engine.with_elide_final_shift(config.elide_final_shift))
    }
}

impl<P: Partitioner> CannonEngine<P> {
    /// Loads copies of the first `N * N` elements of `a` and `b`
    ///
    /// # Errors
    ///
    /// Returns `SizeMismatch` if either input is shorter than `N * N`.
    pub fn with_partitioner(
        geometry: BlockGeometry,
        a: &[f64],
        b: &[f64],
        partitioner: P,
    ) -> Result<Self> {
        let len = geometry.elements();
        for input in [a, b] {
            if input.len() < len {
                return Err(CannonError::SizeMismatch {
                    expected: len,
                    actual: input.len(),
                });
            }
        }

        Ok(Self {
            geometry,
            a: a[..len].to_vec(),
            b: b[..len].to_vec(),
            c: vec![0.0; len],
            partitioner,
            state: EngineState::Idle,
            elide_final_shift: false,
        })
    }

    /// Skip the rotation after the last round
    pub fn with_elide_final_shift(mut self, elide: bool) -> Self {
        self.elide_final_shift = elide;
        self
    }

    /// Resolved block geometry
    pub fn geometry(&self) -> &BlockGeometry {
        &self.geometry
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Backend executing the phases
    pub fn partitioner(&self) -> &P {
        &self.partitioner
    }

    /// Number of rounds whose products have been accumulated
    pub fn rounds_completed(&self) -> usize {
        match self.state {
            EngineState::Idle | EngineState::Skewed => 0,
            EngineState::Multiplied { round } | EngineState::Shifted { round } => round + 1,
            EngineState::Done => self.geometry.num_blocks(),
        }
    }

    /// Accumulator contents (complete once the state is `Done`)
    pub fn output(&self) -> &[f64] {
        &self.c
    }

    /// Consumes the engine and returns the accumulator
    pub fn into_output(self) -> Vec<f64> {
        self.c
    }

    fn transition(&mut self, next: EngineState) {
        #[cfg(feature = "tracing")]
        tracing::debug!(from = %self.state, to = %next, "cannon state transition");
        self.state = next;
    }

    fn invalid(&self, action: &'static str) -> CannonError {
        CannonError::InvalidTransition {
            state: self.state,
            action,
        }
    }

    /// Applies the initial skew
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the engine is `Idle`.
    pub fn skew(&mut self) -> Result<()> {
        if self.state != EngineState::Idle {
            return Err(self.invalid("skew"));
        }
        skew(&self.geometry, &mut self.a, &mut self.b, &self.partitioner);
        self.transition(EngineState::Skewed);
        Ok(())
    }

    /// Accumulates the block products of the next round
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the engine is `Skewed` or `Shifted`.
    pub fn multiply(&mut self) -> Result<()> {
        let round = match self.state {
            EngineState::Skewed => 0,
            EngineState::Shifted { round } => round + 1,
            _ => return Err(self.invalid("multiply")),
        };
        multiply_accumulate(
            &self.geometry,
            &self.a,
            &self.b,
            &mut self.c,
            &self.partitioner,
        );
        self.transition(EngineState::Multiplied { round });
        Ok(())
    }

    /// Rotates A left and B up by one block
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the engine is `Multiplied`.
    pub fn shift(&mut self) -> Result<()> {
        let EngineState::Multiplied { round } = self.state else {
            return Err(self.invalid("shift"));
        };
        rotate(&self.geometry, &mut self.a, &mut self.b, &self.partitioner);
        if round + 1 == self.geometry.num_blocks() {
            self.transition(EngineState::Done);
        } else {
            self.transition(EngineState::Shifted { round });
        }
        Ok(())
    }

    /// One full round: multiply, then shift (unless elided on the last round)
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the engine is `Skewed` or `Shifted`.
    pub fn round(&mut self) -> Result<()> {
        self.multiply()?;
        let last = self.rounds_completed() == self.geometry.num_blocks();
        if last && self.elide_final_shift {
            self.transition(EngineState::Done);
            return Ok(());
        }
        self.shift()
    }

    /// Runs every remaining phase until the engine is `Done`
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the engine stopped between a multiply
    /// and its shift (call [`CannonEngine::shift`] first).
    #[cfg_attr(
        feature = "tracing",
        instrument(skip_all, fields(
            n = self.geometry.n(),
            num_blocks = self.geometry.num_blocks(),
            block_size = self.geometry.block_size(),
            workers = self.partitioner.max_workers(),
        ))
    )]
    pub fn run(&mut self) -> Result<()> {
        if self.state == EngineState::Idle {
            self.skew()?;
        }
        while self.state != EngineState::Done {
            self.round()?;
        }
        Ok(())
    }

    /// Copies the finished product into `out`
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` unless the engine is `Done`
    /// - `SizeMismatch` if `out` is not exactly `N * N` long
    pub fn write_output(&self, out: &mut [f64]) -> Result<()> {
        if self.state != EngineState::Done {
            return Err(self.invalid("write output"));
        }
        if out.len() != self.c.len() {
            return Err(CannonError::SizeMismatch {
                expected: self.c.len(),
                actual: out.len(),
            });
        }
        out.copy_from_slice(&self.c);
        Ok(())
    }
}
