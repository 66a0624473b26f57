//! Snapshot-then-overwrite block realignment shared by skew and rotation
//!
//! Both phases move whole blocks: A-block `(bi, bj)` is replaced by
//! A-block `(bi, a_col)` and B-block `(bi, bj)` by B-block `(b_row, bj)`.
//! Sources and destinations overlap, so every phase first snapshots A and
//! B, then reads only from the snapshots and writes only to the live
//! buffers. Each worker owns the row bands of its block-row range.

use std::ops::Range;

use crate::geometry::BlockGeometry;
use crate::partition::{split_bands, Partitioner};

/// Where the operands for one destination block come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockSource {
    /// Block column of A copied into the destination (same block row)
    pub(crate) a_col: usize,
    /// Block row of B copied into the destination (same block column)
    pub(crate) b_row: usize,
}

/// Rewrites every block of `a` and `b` according to `source(bi, bj)`
pub(crate) fn realign<P, S>(
    geometry: &BlockGeometry,
    a: &mut [f64],
    b: &mut [f64],
    partitioner: &P,
    source: S,
) where
    P: Partitioner,
    S: Fn(usize, usize) -> BlockSource + Sync,
{
    let a_snapshot = a.to_vec();
    let b_snapshot = b.to_vec();

    let ranges = partitioner.partition(geometry.num_blocks());
    let band_len = geometry.band_len();
    let tasks: Vec<_> = ranges
        .iter()
        .cloned()
        .zip(split_bands(a, &ranges, band_len))
        .zip(split_bands(b, &ranges, band_len))
        .map(|((rows, a_band), b_band)| (rows, a_band, b_band))
        .collect();

    partitioner.run_on(tasks, |(rows, a_band, b_band)| {
        realign_band(
            geometry,
            &a_snapshot,
            &b_snapshot,
            rows,
            a_band,
            b_band,
            &source,
        );
    });
}

fn realign_band<S>(
    geometry: &BlockGeometry,
    a_snapshot: &[f64],
    b_snapshot: &[f64],
    rows: Range<usize>,
    a_band: &mut [f64],
    b_band: &mut [f64],
    source: &S,
) where
    S: Fn(usize, usize) -> BlockSource,
{
    let bs = geometry.block_size();
    let n = geometry.n();

    for bi in rows.clone() {
        let local_row = (bi - rows.start) * bs;
        for bj in 0..geometry.num_blocks() {
            let BlockSource { a_col, b_row } = source(bi, bj);
            for i in 0..bs {
                let dst = (local_row + i) * n + bj * bs;

                let a_src = geometry.offset(bi * bs + i, a_col * bs);
                a_band[dst..dst + bs].copy_from_slice(&a_snapshot[a_src..a_src + bs]);

                let b_src = geometry.offset(b_row * bs + i, bj * bs);
                b_band[dst..dst + bs].copy_from_slice(&b_snapshot[b_src..b_src + bs]);
            }
        }
    }
}
