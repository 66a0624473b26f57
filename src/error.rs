//! Error types for Cannon multiplication

use thiserror::Error;

use crate::engine::EngineState;
use crate::task::Stage;

/// Result type for Cannon operations
pub type Result<T> = std::result::Result<T, CannonError>;

/// Errors that can occur while validating or running a Cannon multiplication
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CannonError {
    /// Element count of an operand or the output differs from input A
    #[error("Size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Expected element count (that of input A)
        expected: usize,
        /// Actual element count
        actual: usize,
    },

    /// Element count is not the square of a side length
    #[error("Element count {count} is not a perfect square")]
    NotSquare {
        /// Offending element count
        count: usize,
    },

    /// Side length cannot be tiled exactly by the resolved block grid
    #[error(
        "Side {n} does not tile into {num_blocks}x{num_blocks} blocks of side {block_size}"
    )]
    InexactGeometry {
        /// Matrix side length
        n: usize,
        /// Blocks per dimension
        num_blocks: usize,
        /// Block side length
        block_size: usize,
    },

    /// Zero-sized operands
    #[error("Empty matrix")]
    EmptyMatrix,

    /// A lifecycle method was called out of order
    #[error("Invalid stage: expected {expected}, found {found}")]
    InvalidStage {
        /// Stage the call requires
        expected: Stage,
        /// Stage the task or engine is actually in
        found: Stage,
    },

    /// Engine phase requested from a state that does not allow it
    #[error("Cannot {action} while engine is {state}")]
    InvalidTransition {
        /// Current engine state
        state: EngineState,
        /// Requested operation
        action: &'static str,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_mismatch_error() {
        let err = CannonError::SizeMismatch {
            expected: 16,
            actual: 6,
        };
        assert_eq!(err.to_string(), "Size mismatch: expected 16, got 6");
    }

    #[test]
    fn test_not_square_error() {
        let err = CannonError::NotSquare { count: 6 };
        assert_eq!(err.to_string(), "Element count 6 is not a perfect square");
    }

    #[test]
    fn test_inexact_geometry_error() {
        let err = CannonError::InexactGeometry {
            n: 5,
            num_blocks: 2,
            block_size: 2,
        };
        assert_eq!(
            err.to_string(),
            "Side 5 does not tile into 2x2 blocks of side 2"
        );
    }

    #[test]
    fn test_invalid_stage_error() {
        let err = CannonError::InvalidStage {
            expected: Stage::Validated,
            found: Stage::Created,
        };
        assert_eq!(
            err.to_string(),
            "Invalid stage: expected validated, found created"
        );
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = CannonError::InvalidTransition {
            state: EngineState::Done,
            action: "skew",
        };
        assert_eq!(err.to_string(), "Cannot skew while engine is done");
    }

    #[test]
    fn test_invalid_input_error() {
        let err = CannonError::InvalidInput("zero workers".to_string());
        assert_eq!(err.to_string(), "Invalid input: zero workers");
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(CannonError::EmptyMatrix, CannonError::EmptyMatrix);
        assert_ne!(
            CannonError::EmptyMatrix,
            CannonError::NotSquare { count: 3 }
        );
    }
}
