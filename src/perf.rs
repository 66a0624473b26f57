//! Wall-clock measurement of Cannon tasks
//!
//! Two measurements, both averaged over [`PerfAttr::num_running`] repetitions:
//!
//! - [`Perf::pipeline_run`]: the whole lifecycle (validation, pre-processing,
//!   run, post-processing)
//! - [`Perf::task_run`]: only the `run` stage; setup and copy-out are excluded
//!
//! Each repetition builds a fresh [`CannonTask`], so the output buffer holds
//! the product of the last repetition afterwards.
//!
//! # Example
//!
//! ```
//! use trueno_cannon::perf::{Perf, PerfAttr};
//!
//! let a = vec![1.0; 16];
//! let b = vec![1.0; 16];
//! let mut c = vec![0.0; 16];
//!
//! let results = Perf::new(&a, &b, &mut c)
//!     .pipeline_run(&PerfAttr::new(3))
//!     .unwrap();
//! assert!(results.time_sec >= 0.0);
//! assert!(c.iter().all(|&x| x == 4.0));
//! ```

use std::fmt;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::CannonConfig;
use crate::task::CannonTask;
use crate::{CannonError, Result};

/// Measurement parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerfAttr {
    /// Repetitions to average over
    pub num_running: usize,
}

impl PerfAttr {
    /// Average over `num_running` repetitions
    pub fn new(num_running: usize) -> Self {
        Self { num_running }
    }
}

impl Default for PerfAttr {
    fn default() -> Self {
        Self { num_running: 10 }
    }
}

/// What was timed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfKind {
    /// Full task lifecycle
    Pipeline,
    /// `run` stage only
    TaskRun,
}

/// Averaged timing result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfResults {
    /// Mean seconds per repetition
    pub time_sec: f64,
    /// Repetitions averaged
    pub num_running: usize,
    /// What was timed
    pub kind: PerfKind,
}

impl fmt::Display for PerfResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            PerfKind::Pipeline => "pipeline",
            PerfKind::TaskRun => "task_run",
        };
        write!(
            f,
            "{kind}: {:.10} s (mean of {} runs)",
            self.time_sec, self.num_running
        )
    }
}

/// Timing harness over borrowed buffers
#[derive(Debug)]
pub struct Perf<'a> {
    a: &'a [f64],
    b: &'a [f64],
    output: &'a mut [f64],
    config: CannonConfig,
}

impl<'a> Perf<'a> {
    /// Harness with the default configuration
    pub fn new(a: &'a [f64], b: &'a [f64], output: &'a mut [f64]) -> Self {
        Self {
            a,
            b,
            output,
            config: CannonConfig::default(),
        }
    }

    /// Replace the configuration used for every repetition
    pub fn with_config(mut self, config: CannonConfig) -> Self {
        self.config = config;
        self
    }

    fn task(&mut self) -> CannonTask<'_> {
        CannonTask::new(self.a, self.b, &mut *self.output).with_config(self.config.clone())
    }

    fn finish(kind: PerfKind, total: Duration, attr: &PerfAttr) -> PerfResults {
        let results = PerfResults {
            time_sec: total.as_secs_f64() / attr.num_running as f64,
            num_running: attr.num_running,
            kind,
        };
        #[cfg(feature = "tracing")]
        tracing::info!(%results, "cannon perf");
        results
    }

    /// Times the full lifecycle
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `attr.num_running` is zero
    /// - the first error from any task stage
    #[cfg_attr(feature = "tracing", instrument(skip_all, fields(num_running = attr.num_running)))]
    pub fn pipeline_run(&mut self, attr: &PerfAttr) -> Result<PerfResults> {
        check_attr(attr)?;
        let start = Instant::now();
        for _ in 0..attr.num_running {
            self.task().execute()?;
        }
        Ok(Self::finish(PerfKind::Pipeline, start.elapsed(), attr))
    }

    /// Times only the `run` stage
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `attr.num_running` is zero
    /// - the first error from any task stage
    #[cfg_attr(feature = "tracing", instrument(skip_all, fields(num_running = attr.num_running)))]
    pub fn task_run(&mut self, attr: &PerfAttr) -> Result<PerfResults> {
        check_attr(attr)?;
        let mut total = Duration::ZERO;
        for _ in 0..attr.num_running {
            let mut task = self.task();
            task.validation()?;
            task.pre_processing()?;
            let start = Instant::now();
            task.run()?;
            total += start.elapsed();
            task.post_processing()?;
        }
        Ok(Self::finish(PerfKind::TaskRun, total, attr))
    }
}

fn check_attr(attr: &PerfAttr) -> Result<()> {
    if attr.num_running == 0 {
        return Err(CannonError::InvalidInput(
            "num_running must be at least 1".to_string(),
        ));
    }
    Ok(())
}
