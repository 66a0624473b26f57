//! Parallel work partitioning
//!
//! Every phase of Cannon's algorithm (skew, multiply, rotate) splits the
//! `num_blocks` block-rows into contiguous ranges, one per worker:
//!
//! ```text
//! workers        = min(max_workers, num_blocks)
//! rows_per_range = ceil(num_blocks / workers)
//! range t        = [t * rows_per_range, min((t + 1) * rows_per_range, num_blocks))
//! ```
//!
//! Empty ranges are dropped. Because ranges are disjoint, each worker gets
//! its own mutable row band of every destination buffer (see `split_bands`)
//! and no locking is needed; [`Partitioner::run_on`] joins all workers
//! before returning, which is the only barrier between phases.
//!
//! # Backends
//!
//! - [`Sequential`]: runs every task on the calling thread
//! - [`ScopedThreads`]: one `std::thread::scope` thread per task, spawned fresh per phase
//! - [`RayonPool`]: tasks dispatched on the rayon global pool (feature `parallel`)
//! - [`ParallelBackend`]: runtime selection between the above

use std::num::NonZeroUsize;
use std::ops::Range;

use crate::config::BackendKind;
use crate::{CannonError, Result};

/// Splits `num_blocks` block-rows into at most `max_workers` contiguous ranges
///
/// # Example
///
/// ```
/// use trueno_cannon::partition::partition_rows;
///
/// assert_eq!(partition_rows(5, 2), vec![0..3, 3..5]);
/// assert_eq!(partition_rows(3, 8), vec![0..1, 1..2, 2..3]);
/// ```
pub fn partition_rows(num_blocks: usize, max_workers: usize) -> Vec<Range<usize>> {
    let workers = max_workers.min(num_blocks);
    if workers == 0 {
        return Vec::new();
    }
    let rows_per_range = num_blocks.div_ceil(workers);

    (0..workers)
        .map(|t| {
            let start = t * rows_per_range;
            start..((t + 1) * rows_per_range).min(num_blocks)
        })
        .filter(|range| range.start < range.end)
        .collect()
}

/// Splits `buf` into one mutable band per range
///
/// Range `r` maps to elements `[r.start * band_len, r.end * band_len)`.
/// Ranges must be sorted and non-overlapping, as produced by
/// [`partition_rows`]. Elements past the last range are not handed out.
/// Callers size `buf` from the same geometry that produced the ranges.
pub(crate) fn split_bands<'a>(
    buf: &'a mut [f64],
    ranges: &[Range<usize>],
    band_len: usize,
) -> Vec<&'a mut [f64]> {
    let mut rest = buf;
    let mut consumed = 0;
    let mut bands = Vec::with_capacity(ranges.len());

    for range in ranges {
        let start = range.start * band_len;
        let end = range.end * band_len;
        let (_, tail) = std::mem::take(&mut rest).split_at_mut(start - consumed);
        let (band, tail) = tail.split_at_mut(end - start);
        bands.push(band);
        rest = tail;
        consumed = end;
    }

    bands
}

/// Number of hardware threads, falling back to one
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Capability interface for executing one phase over the block grid
///
/// A backend decides how many workers a phase may use and how per-range
/// tasks are executed. The phase code (skew, multiply, rotate) is identical
/// for every backend.
pub trait Partitioner: Send + Sync {
    /// Upper bound on workers per phase
    fn max_workers(&self) -> usize;

    /// Block-row ranges for one phase, one per worker
    fn partition(&self, num_blocks: usize) -> Vec<Range<usize>> {
        partition_rows(num_blocks, self.max_workers())
    }

    /// Runs `phase` once per task and returns after all of them finished
    fn run_on<T, F>(&self, tasks: Vec<T>, phase: F)
    where
        T: Send,
        F: Fn(T) + Sync;
}

/// Runs every task in order on the calling thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sequential;

impl Partitioner for Sequential {
    fn max_workers(&self) -> usize {
        1
    }

    fn run_on<T, F>(&self, tasks: Vec<T>, phase: F)
    where
        T: Send,
        F: Fn(T) + Sync,
    {
        tasks.into_iter().for_each(phase);
    }
}

/// One scoped OS thread per task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopedThreads {
    workers: usize,
}

impl ScopedThreads {
    /// Uses every available hardware thread
    pub fn new() -> Self {
        Self {
            workers: available_workers(),
        }
    }

    /// Uses at most `workers` threads
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `workers` is zero.
    pub fn with_workers(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(CannonError::InvalidInput(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(Self { workers })
    }
}

impl Default for ScopedThreads {
    fn default() -> Self {
        Self::new()
    }
}

impl Partitioner for ScopedThreads {
    fn max_workers(&self) -> usize {
        self.workers
    }

    fn run_on<T, F>(&self, tasks: Vec<T>, phase: F)
    where
        T: Send,
        F: Fn(T) + Sync,
    {
        // A single range gains nothing from a spawn
        if tasks.len() <= 1 {
            tasks.into_iter().for_each(phase);
            return;
        }

        let phase = &phase;
        std::thread::scope(|s| {
            for task in tasks {
                s.spawn(move || phase(task));
            }
        });
    }
}

/// Tasks dispatched on the rayon global thread pool
#[cfg(feature = "parallel")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayonPool {
    workers: usize,
}

#[cfg(feature = "parallel")]
impl RayonPool {
    /// Uses as many ranges as the global pool has threads
    pub fn new() -> Self {
        Self {
            workers: rayon::current_num_threads(),
        }
    }

    /// Splits into at most `workers` ranges
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `workers` is zero.
    pub fn with_workers(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(CannonError::InvalidInput(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(Self { workers })
    }
}

#[cfg(feature = "parallel")]
impl Default for RayonPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "parallel")]
impl Partitioner for RayonPool {
    fn max_workers(&self) -> usize {
        self.workers
    }

    fn run_on<T, F>(&self, tasks: Vec<T>, phase: F)
    where
        T: Send,
        F: Fn(T) + Sync,
    {
        use rayon::prelude::*;

        tasks.into_par_iter().for_each(&phase);
    }
}

/// Backend selected at runtime from [`crate::CannonConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelBackend {
    /// See [`Sequential`]
    Sequential(Sequential),
    /// See [`ScopedThreads`]
    Threads(ScopedThreads),
    /// See [`RayonPool`]
    #[cfg(feature = "parallel")]
    Rayon(RayonPool),
}

impl ParallelBackend {
    /// Builds the backend for `kind`, optionally capping the worker count
    ///
    /// `BackendKind::Auto` picks rayon when the `parallel` feature is
    /// enabled and scoped threads otherwise. Requesting `Rayon` without the
    /// feature falls back to scoped threads.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `workers` is `Some(0)`.
    pub fn select(kind: BackendKind, workers: Option<usize>) -> Result<Self> {
        match kind {
            BackendKind::Sequential => {
                if workers == Some(0) {
                    return Err(CannonError::InvalidInput(
                        "worker count must be at least 1".to_string(),
                    ));
                }
                Ok(Self::Sequential(Sequential))
            }
            BackendKind::Threads => Ok(Self::Threads(match workers {
                Some(w) => ScopedThreads::with_workers(w)?,
                None => ScopedThreads::new(),
            })),
            #[cfg(feature = "parallel")]
            BackendKind::Auto | BackendKind::Rayon => Ok(Self::Rayon(match workers {
                Some(w) => RayonPool::with_workers(w)?,
                None => RayonPool::new(),
            })),
            #[cfg(not(feature = "parallel"))]
            BackendKind::Auto | BackendKind::Rayon => Self::select(BackendKind::Threads, workers),
        }
    }

    /// Kind of the wrapped backend
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Sequential(_) => BackendKind::Sequential,
            Self::Threads(_) => BackendKind::Threads,
            #[cfg(feature = "parallel")]
            Self::Rayon(_) => BackendKind::Rayon,
        }
    }
}

impl Default for ParallelBackend {
    fn default() -> Self {
        #[cfg(feature = "parallel")]
        {
            Self::Rayon(RayonPool::new())
        }
        #[cfg(not(feature = "parallel"))]
        {
            Self::Threads(ScopedThreads::new())
        }
    }
}

impl Partitioner for ParallelBackend {
    fn max_workers(&self) -> usize {
        match self {
            Self::Sequential(p) => p.max_workers(),
            Self::Threads(p) => p.max_workers(),
            #[cfg(feature = "parallel")]
            Self::Rayon(p) => p.max_workers(),
        }
    }

    fn run_on<T, F>(&self, tasks: Vec<T>, phase: F)
    where
        T: Send,
        F: Fn(T) + Sync,
    {
        match self {
            Self::Sequential(p) => p.run_on(tasks, phase),
            Self::Threads(p) => p.run_on(tasks, phase),
            #[cfg(feature = "parallel")]
            Self::Rayon(p) => p.run_on(tasks, phase),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_partition_even_split() {
        assert_eq!(partition_rows(4, 2), vec![0..2, 2..4]);
        assert_eq!(partition_rows(4, 4), vec![0..1, 1..2, 2..3, 3..4]);
    }

    #[test]
    fn test_partition_uneven_split() {
        assert_eq!(partition_rows(15, 4), vec![0..4, 4..8, 8..12, 12..15]);
        assert_eq!(partition_rows(5, 2), vec![0..3, 3..5]);
    }

    #[test]
    fn test_partition_drops_empty_ranges() {
        // ceil(5 / 4) = 2 → [0,2) [2,4) [4,5) [6,5) empty
        assert_eq!(partition_rows(5, 4), vec![0..2, 2..4, 4..5]);
    }

    #[test]
    fn test_partition_more_workers_than_rows() {
        assert_eq!(partition_rows(2, 64), vec![0..1, 1..2]);
    }

    #[test]
    fn test_partition_degenerate() {
        assert!(partition_rows(0, 4).is_empty());
        assert!(partition_rows(4, 0).is_empty());
        assert_eq!(partition_rows(1, 1), vec![0..1]);
    }

    #[test]
    fn test_partition_covers_all_rows() {
        for num_blocks in 1..40 {
            for workers in 1..12 {
                let ranges = partition_rows(num_blocks, workers);
                assert!(ranges.len() <= workers);
                let mut next = 0;
                for r in &ranges {
                    assert_eq!(r.start, next);
                    assert!(r.start < r.end);
                    next = r.end;
                }
                assert_eq!(next, num_blocks);
            }
        }
    }

    #[test]
    fn test_split_bands_disjoint() {
        let mut buf: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let ranges = vec![0..1, 1..3];
        let bands = split_bands(&mut buf, &ranges, 4);
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0], &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(bands[1], &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_split_bands_leaves_tail() {
        let mut buf = vec![0.0; 10];
        let bands = split_bands(&mut buf, &[0..2], 4);
        assert_eq!(bands[0].len(), 8);
    }

    #[test]
    fn test_split_bands_with_gap() {
        let mut buf: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let bands = split_bands(&mut buf, &[1..2], 2);
        assert_eq!(bands[0], &[2.0, 3.0]);
    }

    fn assert_runs_every_task<P: Partitioner>(p: &P) {
        let counter = AtomicUsize::new(0);
        let seen = Mutex::new(Vec::new());
        p.run_on((0..7).collect(), |t: usize| {
            counter.fetch_add(1, Ordering::SeqCst);
            seen.lock().unwrap().push(t);
        });
        assert_eq!(counter.load(Ordering::SeqCst), 7);
        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_sequential_runs_in_order() {
        let order = Mutex::new(Vec::new());
        Sequential.run_on(vec![3, 1, 2], |t: i32| order.lock().unwrap().push(t));
        assert_eq!(order.into_inner().unwrap(), vec![3, 1, 2]);
        assert_eq!(Sequential.partition(8), vec![0..8]);
    }

    #[test]
    fn test_scoped_threads_runs_every_task() {
        assert_runs_every_task(&ScopedThreads::with_workers(3).unwrap());
        assert_runs_every_task(&ScopedThreads::new());
    }

    #[test]
    fn test_scoped_threads_partition_respects_cap() {
        let p = ScopedThreads::with_workers(2).unwrap();
        assert_eq!(p.partition(4), vec![0..2, 2..4]);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            ScopedThreads::with_workers(0),
            Err(CannonError::InvalidInput(_))
        ));
        assert!(ParallelBackend::select(BackendKind::Sequential, Some(0)).is_err());
        assert!(ParallelBackend::select(BackendKind::Threads, Some(0)).is_err());
        assert!(ParallelBackend::select(BackendKind::Auto, Some(0)).is_err());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_rayon_runs_every_task() {
        assert_runs_every_task(&RayonPool::with_workers(4).unwrap());
        assert!(RayonPool::new().max_workers() >= 1);
    }

    #[test]
    fn test_select_backends() {
        let seq = ParallelBackend::select(BackendKind::Sequential, None).unwrap();
        assert_eq!(seq.kind(), BackendKind::Sequential);
        assert_eq!(seq.max_workers(), 1);

        let threads = ParallelBackend::select(BackendKind::Threads, Some(3)).unwrap();
        assert_eq!(threads.kind(), BackendKind::Threads);
        assert_eq!(threads.max_workers(), 3);
        assert_runs_every_task(&threads);

        let auto = ParallelBackend::select(BackendKind::Auto, Some(2)).unwrap();
        #[cfg(feature = "parallel")]
        assert_eq!(auto.kind(), BackendKind::Rayon);
        #[cfg(not(feature = "parallel"))]
        assert_eq!(auto.kind(), BackendKind::Threads);
        assert_eq!(auto.max_workers(), 2);
        assert_runs_every_task(&auto);
    }
}
