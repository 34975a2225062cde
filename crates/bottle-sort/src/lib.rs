//! Shortest-path solver for liquid sorting puzzles.
//!
//! A puzzle is a set of bottles, each a stack of up to four colored units.
//! A pour moves the top run of one bottle onto another whose top color
//! matches (or which is empty), provided the whole run fits. The solver
//! finds a minimum-length sequence of pours leaving every bottle empty or
//! full of a single color.

pub mod bottle;
pub mod error;
pub mod moves;
pub mod puzzle;
pub mod solver;
pub mod state;

// Re-export main types
pub use bottle::{Bottle, Fingerprint, CAPACITY};
pub use error::PuzzleError;
pub use moves::{candidate_moves, next_states, Move, Successor};
pub use puzzle::{BottleSpec, Color, Palette, PuzzleConfig};
pub use solver::{
    solve, solve_with_observer, ExpansionEvent, NoopObserver, SearchObserver, SolverConfig,
    SolverResult, TracingObserver, Transition,
};
pub use state::{BottleId, BucketKey, CanonicalKey, Layout, State};
