//! Move generation: every distinct state reachable with a single pour.
//!
//! Pours are only legal between bottles sharing a top color or into an
//! empty bottle, so candidates come straight from the state's buckets
//! instead of all ordered bottle pairs.

use rustc_hash::FxHashSet;

use crate::error::PuzzleError;
use crate::state::{BottleId, BucketKey, CanonicalKey, State};

/// A pour of `source`'s top run into `destination`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub source: BottleId,
    pub destination: BottleId,
}

impl Move {
    pub fn new(source: BottleId, destination: BottleId) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// A state reachable from the current one, with the pour that produced it
#[derive(Debug, Clone)]
pub struct Successor {
    pub pour: Move,
    pub state: State,
    pub key: CanonicalKey,
}

/// Candidate pours, in bucket order then slot order.
///
/// Within a top-color bucket every ordered pair that passes `can_combine`
/// is a candidate. Every non-empty bottle also gets exactly one pour into
/// the first empty bottle: empty bottles are interchangeable.
pub fn candidate_moves(state: &State) -> Result<Vec<Move>, PuzzleError> {
    let mut moves = Vec::new();

    for (key, members) in state.buckets() {
        if key == BucketKey::Empty {
            continue;
        }
        for &destination in members {
            let poured_into = state.bottle(destination)?;
            for &source in members {
                if source != destination && poured_into.can_combine(state.bottle(source)?) {
                    moves.push(Move::new(source, destination));
                }
            }
        }
    }

    if let Some(&empty) = state.bucket(BucketKey::Empty).first() {
        for (source, bottle) in state.bottles() {
            if !bottle.is_empty() {
                moves.push(Move::new(source, empty));
            }
        }
    }

    Ok(moves)
}

/// Distinct successor states of `state`.
///
/// Pours yielding the same configuration collapse to the first one, and
/// pours that leave the configuration unchanged (a single-color bottle
/// into an empty one) are dropped.
pub fn next_states(state: &State) -> Result<Vec<Successor>, PuzzleError> {
    let mut seen: FxHashSet<CanonicalKey> = FxHashSet::default();
    seen.insert(state.canonical_key());

    let mut successors = Vec::new();
    for pour in candidate_moves(state)? {
        let next = state.apply_move(pour.source, pour.destination)?;
        let key = next.canonical_key();
        if seen.insert(key.clone()) {
            successors.push(Successor {
                pour,
                state: next,
                key,
            });
        }
    }
    Ok(successors)
}
