//! Initial alignment (skew)
//!
//! Before the first round, block-row `bi` of A is rotated left by `bi`
//! blocks and block-column `bj` of B is rotated up by `bj` blocks:
//!
//! ```text
//! A'(bi, bj) = A(bi, (bi + bj) mod num_blocks)
//! B'(bi, bj) = B((bi + bj) mod num_blocks, bj)
//! ```
//!
//! After this, the A and B blocks resident at `(bi, bj)` share the inner
//! index `k = (bi + bj) mod num_blocks` and can be multiplied in place.

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::align::{realign, BlockSource};
use crate::geometry::BlockGeometry;
use crate::partition::Partitioner;

/// Source blocks for destination `(bi, bj)` during the skew
pub(crate) fn skew_source(bi: usize, bj: usize, num_blocks: usize) -> BlockSource {
    BlockSource {
        a_col: (bj + bi) % num_blocks,
        b_row: (bi + bj) % num_blocks,
    }
}

/// Applies the initial skew to the working copies of A and B
#[cfg_attr(
    feature = "tracing",
    instrument(skip_all, fields(
        n = geometry.n(),
        num_blocks = geometry.num_blocks(),
        block_size = geometry.block_size(),
        workers = partitioner.max_workers(),
    ))
)]
pub(crate) fn skew<P: Partitioner>(
    geometry: &BlockGeometry,
    a: &mut [f64],
    b: &mut [f64],
    partitioner: &P,
) {
    let num_blocks = geometry.num_blocks();
    realign(geometry, a, b, partitioner, |bi, bj| {
        skew_source(bi, bj, num_blocks)
    });
}
