//! Per-round torus shift
//!
//! After each round every block-row of A moves one block left and every
//! block-column of B moves one block up, wrapping around:
//!
//! ```text
//! A'(bi, bj) = A(bi, (bj + 1) mod num_blocks)
//! B'(bi, bj) = B((bi + 1) mod num_blocks, bj)
//! ```
//!
//! The inner index shared by the blocks resident at `(bi, bj)` therefore
//! advances to `(bi + bj + r) mod num_blocks` in round `r`.

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::align::{realign, BlockSource};
use crate::geometry::BlockGeometry;
use crate::partition::Partitioner;

/// Source blocks for destination `(bi, bj)` during a rotation
pub(crate) fn rotate_source(bi: usize, bj: usize, num_blocks: usize) -> BlockSource {
    BlockSource {
        a_col: (bj + 1) % num_blocks,
        b_row: (bi + 1) % num_blocks,
    }
}

/// Shifts A one block left and B one block up
#[cfg_attr(
    feature = "tracing",
    instrument(skip_all, fields(
        n = geometry.n(),
        num_blocks = geometry.num_blocks(),
        block_size = geometry.block_size(),
        workers = partitioner.max_workers(),
    ))
)]
pub(crate) fn rotate<P: Partitioner>(
    geometry: &BlockGeometry,
    a: &mut [f64],
    b: &mut [f64],
    partitioner: &P,
) {
    let num_blocks = geometry.num_blocks();
    realign(geometry, a, b, partitioner, |bi, bj| {
        rotate_source(bi, bj, num_blocks)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Sequential;

    #[test]
    fn test_rotate_source() {
        assert_eq!(rotate_source(0, 0, 3), BlockSource { a_col: 1, b_row: 1 });
        assert_eq!(rotate_source(2, 2, 3), BlockSource { a_col: 0, b_row: 0 });
    }

    #[test]
    fn test_single_block_rotation_is_noop() {
        let g = BlockGeometry::from_side(3).unwrap();
        assert_eq!(g.num_blocks(), 1);
        let mut a: Vec<f64> = (0..9).map(|i| i as f64).collect();
        let mut b = a.clone();
        let expected = a.clone();

        rotate(&g, &mut a, &mut b, &Sequential);

        assert_eq!(a, expected);
        assert_eq!(b, expected);
    }

    #[test]
    fn test_num_blocks_rotations_restore_original() {
        let g = BlockGeometry::from_side(16).unwrap();
        let a0: Vec<f64> = (0..256).map(|i| i as f64).collect();
        let b0: Vec<f64> = (0..256).map(|i| -(i as f64)).collect();
        let (mut a, mut b) = (a0.clone(), b0.clone());

        rotate(&g, &mut a, &mut b, &Sequential);
        assert_ne!(a, a0);
        assert_ne!(b, b0);

        for _ in 1..g.num_blocks() {
            rotate(&g, &mut a, &mut b, &Sequential);
        }
        assert_eq!(a, a0);
        assert_eq!(b, b0);
    }

    #[test]
    fn test_rotate_4x4() {
        let g = BlockGeometry::from_side(4).unwrap();
        let mut a: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let mut b = a.clone();

        rotate(&g, &mut a, &mut b, &Sequential);

        #[rustfmt::skip]
        let a_expected = vec![
             2.0,  3.0,  0.0,  1.0,
             6.0,  7.0,  4.0,  5.0,
            10.0, 11.0,  8.0,  9.0,
            14.0, 15.0, 12.0, 13.0,
        ];
        #[rustfmt::skip]
        let b_expected = vec![
             8.0,  9.0, 10.0, 11.0,
            12.0, 13.0, 14.0, 15.0,
             0.0,  1.0,  2.0,  3.0,
             4.0,  5.0,  6.0,  7.0,
        ];
        assert_eq!(a, a_expected);
        assert_eq!(b, b_expected);
    }
}
