//! Block geometry resolution
//!
//! Cannon's algorithm tiles an `N x N` matrix into a `num_blocks x num_blocks`
//! grid of square blocks of side `block_size`:
//!
//! ```text
//! N          = floor(sqrt(count))
//! num_blocks = floor(sqrt(N))
//! block_size = floor(N / num_blocks)
//! ```
//!
//! The grid is only correct when `num_blocks * block_size == N`. Under
//! [`GeometryPolicy::Strict`] anything else is rejected; under
//! [`GeometryPolicy::Truncate`] the covered square is processed and the
//! remaining rows and columns are left untouched.
//!
//! # Example
//!
//! ```
//! use trueno_cannon::geometry::BlockGeometry;
//!
//! let g = BlockGeometry::resolve(16 * 16).unwrap();
//! assert_eq!(g.n(), 16);
//! assert_eq!(g.num_blocks(), 4);
//! assert_eq!(g.block_size(), 4);
//! ```

use crate::{CannonError, Result};

/// How to treat sides that the block grid cannot tile exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryPolicy {
    /// Reject non-square counts and inexact tilings
    #[default]
    Strict,
    /// Floor everything and process only the covered square
    Truncate,
}

/// Resolved block grid for one multiplication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGeometry {
    n: usize,
    num_blocks: usize,
    block_size: usize,
}

/// Integer square root (floor)
fn isqrt(x: usize) -> usize {
    let mut r = (x as f64).sqrt() as usize;
    // f64 rounding can be off by one for large inputs
    while r > 0 && r.checked_mul(r).map_or(true, |sq| sq > x) {
        r -= 1;
    }
    while (r + 1).checked_mul(r + 1).is_some_and(|sq| sq <= x) {
        r += 1;
    }
    r
}

impl BlockGeometry {
    /// Resolves the geometry from the element count of input A
    ///
    /// Applies the floor arithmetic without any exactness check; use
    /// [`BlockGeometry::resolve_with`] to enforce a policy.
    ///
    /// # Errors
    ///
    /// Returns `EmptyMatrix` if `count` is zero.
    pub fn resolve(count: usize) -> Result<Self> {
        Self::from_side(isqrt(count))
    }

    /// Resolves the geometry from a side length
    ///
    /// # Errors
    ///
    /// Returns `EmptyMatrix` if `n` is zero.
    pub fn from_side(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(CannonError::EmptyMatrix);
        }
        let num_blocks = isqrt(n);
        let block_size = n / num_blocks;
        Ok(Self {
            n,
            num_blocks,
            block_size,
        })
    }

    /// Resolves the geometry and applies `policy`
    ///
    /// # Errors
    ///
    /// - `EmptyMatrix` if `count` is zero
    /// - `NotSquare` if `count` is not a perfect square (strict only)
    /// - `InexactGeometry` if the grid does not tile `N` (strict only)
    ///
    /// # Example
    ///
    /// ```
    /// use trueno_cannon::geometry::{BlockGeometry, GeometryPolicy};
    ///
    /// // 5 = 2 blocks of 2, one row/column left over
    /// assert!(BlockGeometry::resolve_with(25, GeometryPolicy::Strict).is_err());
    /// let g = BlockGeometry::resolve_with(25, GeometryPolicy::Truncate).unwrap();
    /// assert_eq!(g.covered_side(), 4);
    /// ```
    pub fn resolve_with(count: usize, policy: GeometryPolicy) -> Result<Self> {
        let geometry = Self::resolve(count)?;
        if policy == GeometryPolicy::Strict {
            if geometry.elements() != count {
                return Err(CannonError::NotSquare { count });
            }
            if !geometry.is_exact() {
                return Err(CannonError::InexactGeometry {
                    n: geometry.n,
                    num_blocks: geometry.num_blocks,
                    block_size: geometry.block_size,
                });
            }
        }
        Ok(geometry)
    }

    /// Matrix side length `N`
    pub fn n(&self) -> usize {
        self.n
    }

    /// Blocks per dimension (also the number of rounds)
    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Side length of one block
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of elements in one full matrix (`N * N`)
    pub fn elements(&self) -> usize {
        self.n * self.n
    }

    /// Side of the square actually covered by the block grid
    pub fn covered_side(&self) -> usize {
        self.num_blocks * self.block_size
    }

    /// Whether the block grid tiles the matrix exactly
    pub fn is_exact(&self) -> bool {
        self.covered_side() == self.n
    }

    /// Elements in one block-row band (`block_size` full matrix rows)
    pub fn band_len(&self) -> usize {
        self.block_size * self.n
    }

    /// Flat offset of element `(row, col)` in a row-major buffer
    #[inline]
    pub fn offset(&self, row: usize, col: usize) -> usize {
        row * self.n + col
    }
}
