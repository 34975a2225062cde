//! Uniform-cost search for a shortest pour sequence.
//!
//! Every pour costs one move, so ordering the frontier by depth (FIFO on
//! ties) expands states breadth-first and the first winning state popped
//! is reached with the minimum number of pours. Search nodes keep only a
//! back-reference to their parent; the path is rebuilt once, at the goal.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;

use crate::error::PuzzleError;
use crate::moves::{next_states, Move};
use crate::state::{CanonicalKey, State};

/// Configuration for the solver
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Stop after expanding this many states
    pub max_expansions: Option<usize>,
    /// Maximum time to search
    pub timeout: Option<Duration>,
    /// Skip expansion of states with no legal pour
    pub prune_dead_ends: bool,
}

/// One edge of the solution chain.
///
/// The first transition of a chain has no predecessor and no pour: it
/// carries the initial state.
#[derive(Debug, Clone)]
pub struct Transition {
    pub predecessor: Option<State>,
    pub successor: State,
    pub pour: Option<Move>,
}

/// Result of the solver search
#[derive(Debug, Clone)]
pub struct SolverResult {
    /// Initial state followed by one transition per pour; empty if unsolved
    pub transitions: Vec<Transition>,
    pub solved: bool,
    /// Whether the reachable state space was fully explored
    pub search_exhausted: bool,
    pub states_expanded: usize,
    pub states_generated: usize,
    pub time_elapsed_ms: u64,
}

impl SolverResult {
    /// Number of pours in the solution
    pub fn move_count(&self) -> Option<usize> {
        if self.solved {
            Some(self.transitions.len().saturating_sub(1))
        } else {
            None
        }
    }

    pub fn moves(&self) -> impl Iterator<Item = Move> + '_ {
        self.transitions.iter().filter_map(|t| t.pour)
    }
}

/// Emitted once per expanded state
#[derive(Debug, Clone, Copy)]
pub struct ExpansionEvent<'a> {
    pub depth: usize,
    pub state: &'a State,
    pub key: &'a CanonicalKey,
    /// Distinct successors generated from `state`
    pub branching: usize,
}

/// Hook for per-expansion diagnostics
pub trait SearchObserver {
    fn on_expand(&mut self, event: &ExpansionEvent<'_>);
}

/// Ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SearchObserver for NoopObserver {
    fn on_expand(&mut self, _event: &ExpansionEvent<'_>) {}
}

/// Logs every expansion at `debug` level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SearchObserver for TracingObserver {
    fn on_expand(&mut self, event: &ExpansionEvent<'_>) {
        tracing::debug!(
            depth = event.depth,
            branching = event.branching,
            state = %event.state,
            "expanding state"
        );
    }
}

impl<F> SearchObserver for F
where
    F: FnMut(&ExpansionEvent<'_>),
{
    fn on_expand(&mut self, event: &ExpansionEvent<'_>) {
        self(event)
    }
}

/// A node of the search tree
#[derive(Debug)]
struct SearchNode {
    state: State,
    key: CanonicalKey,
    parent: Option<usize>,
    pour: Option<Move>,
}

/// Find a minimum-length pour sequence from `initial` to a winning state.
pub fn solve(initial: &State, config: &SolverConfig) -> Result<SolverResult, PuzzleError> {
    solve_with_observer(initial, config, &mut NoopObserver)
}

/// [`solve`], reporting every expansion to `observer`.
///
/// Errors from move application are propagated unchanged: they indicate a
/// broken move generator, not an unsolvable puzzle.
pub fn solve_with_observer<O>(
    initial: &State,
    config: &SolverConfig,
    observer: &mut O,
) -> Result<SolverResult, PuzzleError>
where
    O: SearchObserver + ?Sized,
{
    let start_time = Instant::now();
    let deadline = config.timeout.map(|timeout| start_time + timeout);

    let mut nodes = vec![SearchNode {
        state: initial.clone(),
        key: initial.canonical_key(),
        parent: None,
        pour: None,
    }];
    // (depth, node index): node indices grow monotonically, so ties pop FIFO
    let mut frontier: BinaryHeap<Reverse<(usize, usize)>> = BinaryHeap::new();
    frontier.push(Reverse((0, 0)));
    let mut visited: FxHashSet<CanonicalKey> = FxHashSet::default();

    let mut states_expanded: usize = 0;
    let mut states_generated: usize = 1;

    tracing::debug!(
        bottles = initial.slot_count(),
        state = %initial,
        "starting search"
    );

    let finish = |transitions: Vec<Transition>,
                  solved: bool,
                  search_exhausted: bool,
                  states_expanded: usize,
                  states_generated: usize| {
        let result = SolverResult {
            transitions,
            solved,
            search_exhausted,
            states_expanded,
            states_generated,
            time_elapsed_ms: start_time.elapsed().as_millis() as u64,
        };
        tracing::debug!(
            solved = result.solved,
            moves = ?result.move_count(),
            search_exhausted = result.search_exhausted,
            states_expanded = result.states_expanded,
            states_generated = result.states_generated,
            elapsed_ms = result.time_elapsed_ms,
            "search finished"
        );
        result
    };

    while let Some(Reverse((depth, index))) = frontier.pop() {
        // Check timeout
        if deadline.is_some_and(|deadline| Instant::now() > deadline) {
            return Ok(finish(Vec::new(), false, false, states_expanded, states_generated));
        }

        // Skip states already expanded
        let node = &nodes[index];
        if !visited.insert(node.key.clone()) {
            continue;
        }

        // Goal test on pop keeps the chain minimal
        if node.state.is_winning_state() {
            let transitions = rebuild_path(&nodes, index);
            return Ok(finish(transitions, true, false, states_expanded, states_generated));
        }

        if config.prune_dead_ends && node.state.is_terminal_state() {
            continue;
        }

        if config
            .max_expansions
            .is_some_and(|limit| states_expanded >= limit)
        {
            return Ok(finish(Vec::new(), false, false, states_expanded, states_generated));
        }

        // Expand
        let successors = next_states(&node.state)?;
        states_expanded += 1;
        observer.on_expand(&ExpansionEvent {
            depth,
            state: &node.state,
            key: &node.key,
            branching: successors.len(),
        });

        // Enqueue unseen successors one pour deeper
        for successor in successors {
            if visited.contains(&successor.key) {
                continue;
            }
            nodes.push(SearchNode {
                state: successor.state,
                key: successor.key,
                parent: Some(index),
                pour: Some(successor.pour),
            });
            frontier.push(Reverse((depth + 1, nodes.len() - 1)));
            states_generated += 1;
        }
    }

    Ok(finish(Vec::new(), false, true, states_expanded, states_generated))
}

/// Walk parent links from `goal` back to the root.
fn rebuild_path(nodes: &[SearchNode], goal: usize) -> Vec<Transition> {
    let mut chain = Vec::new();
    let mut cursor = Some(goal);
    while let Some(index) = cursor {
        chain.push(index);
        cursor = nodes[index].parent;
    }
    chain.reverse();

    chain
        .iter()
        .map(|&index| {
            let node = &nodes[index];
            Transition {
                predecessor: node.parent.map(|parent| nodes[parent].state.clone()),
                successor: node.state.clone(),
                pour: node.pour,
            }
        })
        .collect()
}
