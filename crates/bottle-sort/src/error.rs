//! Error type shared by the puzzle model and the search engine.

use thiserror::Error;

use crate::state::BottleId;

/// Failures raised by bottle construction, pours and slot lookups.
///
/// None of these are recoverable by the solver: a `Validation` error rejects
/// the puzzle input, while `InvalidMove` and `NotFound` indicate a defect in
/// whatever produced the move.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PuzzleError {
    #[error(
        "bottle{} holds {len} units, capacity is {capacity}",
        .index.map(|i| format!(" {i}")).unwrap_or_default()
    )]
    Validation {
        /// Position in the input list, when the bottle came from a puzzle file.
        index: Option<usize>,
        len: usize,
        capacity: usize,
    },

    #[error("puzzle uses more than {limit} distinct colors")]
    TooManyColors { limit: usize },

    #[error("invalid move: {reason}")]
    InvalidMove { reason: String },

    #[error("no bottle in slot {id} (state has {slots} slots)")]
    NotFound { id: BottleId, slots: usize },
}

impl PuzzleError {
    pub(crate) fn invalid_move(reason: impl Into<String>) -> Self {
        PuzzleError::InvalidMove {
            reason: reason.into(),
        }
    }

    /// Attach the input position to a validation error.
    pub(crate) fn at_bottle(self, position: usize) -> Self {
        match self {
            PuzzleError::Validation { len, capacity, .. } => PuzzleError::Validation {
                index: Some(position),
                len,
                capacity,
            },
            other => other,
        }
    }
}
