//! Local block multiply-accumulate
//!
//! In every round the A-block and B-block resident at `(bi, bj)` are
//! exactly the pair that contributes to output block `(bi, bj)`, so the
//! multiplier never recomputes alignment offsets:
//!
//! ```text
//! C(bi, bj) += A(bi, bj) x B(bi, bj)        (block_size^3 multiply-adds)
//! ```
//!
//! Each worker owns the output band of its block-row range. No two workers
//! ever touch the same cell of C, so accumulation needs no lock; the join
//! at the end of [`Partitioner::run_on`] is the only synchronization.

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::geometry::BlockGeometry;
use crate::partition::{split_bands, Partitioner};

/// Adds `A(bi, bj) x B(bi, bj)` into block `(bi, bj)` of `c_band`
///
/// `c_band` holds the output rows of block-rows starting at `band_start`,
/// as handed out by `split_bands`. `temp` holds one output row of the block
/// and must be `block_size` long. Rows of A and B are read contiguously;
/// each output cell is summed in `temp` over `k` in ascending order before
/// being added to C, so a cell's update order is fixed regardless of
/// scheduling.
#[inline]
#[allow(clippy::too_many_arguments)]
pub(crate) fn block_multiply_add(
    geometry: &BlockGeometry,
    a: &[f64],
    b: &[f64],
    c_band: &mut [f64],
    band_start: usize,
    bi: usize,
    bj: usize,
    temp: &mut [f64],
) {
    let bs = geometry.block_size();
    let n = geometry.n();
    let row0 = bi * bs;
    let col0 = bj * bs;
    let local_row0 = (bi - band_start) * bs;

    for i in 0..bs {
        let a_start = geometry.offset(row0 + i, col0);
        let a_row = &a[a_start..a_start + bs];
        let c_start = (local_row0 + i) * n + col0;
        temp.fill(0.0);

        for (k, &a_ik) in a_row.iter().enumerate() {
            let b_start = geometry.offset(row0 + k, col0);
            let b_row = &b[b_start..b_start + bs];
            for (t, &b_kj) in temp.iter_mut().zip(b_row) {
                *t += a_ik * b_kj;
            }
        }

        let c_row = &mut c_band[c_start..c_start + bs];
        for (c_ij, &t) in c_row.iter_mut().zip(temp.iter()) {
            *c_ij += t;
        }
    }
}

/// Multiplies every co-located block pair and accumulates into `c`
#[cfg_attr(
    feature = "tracing",
    instrument(skip_all, fields(
        n = geometry.n(),
        num_blocks = geometry.num_blocks(),
        block_size = geometry.block_size(),
        workers = partitioner.max_workers(),
    ))
)]
pub(crate) fn multiply_accumulate<P: Partitioner>(
    geometry: &BlockGeometry,
    a: &[f64],
    b: &[f64],
    c: &mut [f64],
    partitioner: &P,
) {
    let ranges = partitioner.partition(geometry.num_blocks());
    let tasks: Vec<_> = ranges
        .iter()
        .cloned()
        .zip(split_bands(c, &ranges, geometry.band_len()))
        .collect();

    partitioner.run_on(tasks, |(rows, c_band)| {
        let mut temp = vec![0.0; geometry.block_size()];
        for bi in rows.clone() {
            for bj in 0..geometry.num_blocks() {
                block_multiply_add(geometry, a, b, c_band, rows.start, bi, bj, &mut temp);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{ScopedThreads, Sequential};

    #[test]
    fn test_single_block_is_full_product() {
        let g = BlockGeometry::from_side(2).unwrap();
        assert_eq!(g.num_blocks(), 1);
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let b = vec![5.0, 6.0, 7.0, 8.0];
        let mut c = vec![0.0; 4];

        multiply_accumulate(&g, &a, &b, &mut c, &Sequential);

        assert_eq!(c, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_single_block_bitwise_matches_naive_sum() {
        let g = BlockGeometry::from_side(3).unwrap();
        let a: Vec<f64> = (0..9).map(|i| (i as f64 * 0.71).sin()).collect();
        let b: Vec<f64> = (0..9).map(|i| (i as f64 * 0.29).cos()).collect();
        let mut c = vec![0.0; 9];

        multiply_accumulate(&g, &a, &b, &mut c, &Sequential);

        for i in 0..3 {
            for j in 0..3 {
                let mut sum = 0.0;
                for k in 0..3 {
                    sum += a[i * 3 + k] * b[k * 3 + j];
                }
                assert_eq!(c[i * 3 + j].to_bits(), sum.to_bits(), "({i}, {j})");
            }
        }
    }

    #[test]
    fn test_only_co_located_blocks_multiply() {
        // 4x4 with 2x2 blocks: C(bi, bj) = A(bi, bj) x B(bi, bj)
        let g = BlockGeometry::from_side(4).unwrap();
        #[rustfmt::skip]
        let a = vec![
            1.0, 0.0, 2.0, 0.0,
            0.0, 1.0, 0.0, 2.0,
            3.0, 0.0, 4.0, 0.0,
            0.0, 3.0, 0.0, 4.0,
        ];
        let b: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let mut c = vec![0.0; 16];

        multiply_accumulate(&g, &a, &b, &mut c, &Sequential);

        #[rustfmt::skip]
        let expected = vec![
             0.0,  1.0,  4.0,  6.0,
             4.0,  5.0, 12.0, 14.0,
            24.0, 27.0, 40.0, 44.0,
            36.0, 39.0, 56.0, 60.0,
        ];
        assert_eq!(c, expected);
    }

    #[test]
    fn test_accumulates_into_existing_output() {
        let g = BlockGeometry::from_side(4).unwrap();
        let a = vec![1.0; 16];
        let b = vec![1.0; 16];
        let mut c = vec![10.0; 16];

        multiply_accumulate(&g, &a, &b, &mut c, &Sequential);
        multiply_accumulate(&g, &a, &b, &mut c, &Sequential);

        assert!(c.iter().all(|&x| x == 14.0));
    }

    #[test]
    fn test_parallel_matches_sequential_bitwise() {
        let g = BlockGeometry::from_side(16).unwrap();
        let a: Vec<f64> = (0..256).map(|i| (i as f64 * 0.37).sin()).collect();
        let b: Vec<f64> = (0..256).map(|i| (i as f64 * 0.11).cos()).collect();

        let mut c_seq = vec![0.0; 256];
        multiply_accumulate(&g, &a, &b, &mut c_seq, &Sequential);

        for workers in 1..=5 {
            let mut c_par = vec![0.0; 256];
            let p = ScopedThreads::with_workers(workers).unwrap();
            multiply_accumulate(&g, &a, &b, &mut c_par, &p);
            assert_eq!(c_seq, c_par, "workers={workers}");
        }
    }
}
