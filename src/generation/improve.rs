//! Hill climbing by pairwise position swaps.
//!
//! A position is a (cell, room) pair. Two placed sessions may trade
//! positions, and a placed session may trade with a vacant position, which
//! amounts to moving it there. Moves are committed only on strict score gain.

use log::{debug, trace};

use crate::data::{Cell, RoomId};
use crate::generation::Problem;
use crate::generation::feasibility::is_feasible;
use crate::generation::score::{relocation_delta, score};
use crate::generation::state::PlacementState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImproveStats {
    pub passes: usize,
    pub swaps: usize,
    /// The pass cap was reached while moves were still being found.
    pub exhausted: bool,
}

pub struct LocalImprover {
    max_iterations: usize,
}

impl LocalImprover {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    /// Improves `state` in place. Never adds or removes assignments.
    pub fn improve(&self, problem: &Problem<'_>, state: &mut PlacementState) -> ImproveStats {
        let mut stats = ImproveStats::default();
        let mut improved = true;

        while improved && stats.passes < self.max_iterations {
            improved = false;
            stats.passes += 1;

            let n = state.len();
            for i in 0..n {
                for j in (i + 1)..n {
                    if swap_if_better(problem, state, i, j) {
                        stats.swaps += 1;
                        improved = true;
                    }
                }
            }
            for i in 0..n {
                if move_to_best_vacancy(problem, state, i) {
                    stats.swaps += 1;
                    improved = true;
                }
            }
        }

        stats.exhausted = improved && stats.passes >= self.max_iterations;
        debug!(
            "Local improver made {} swaps in {} passes.",
            stats.swaps, stats.passes
        );
        stats
    }
}

/// Swaps the positions of assignments `i` and `j` if both stay feasible and
/// the score strictly rises. Leaves the state untouched otherwise.
fn swap_if_better(problem: &Problem<'_>, state: &mut PlacementState, i: usize, j: usize) -> bool {
    let a = state.assignments()[i].clone();
    let b = state.assignments()[j].clone();
    if a.cell == b.cell && a.room_id == b.room_id {
        return false;
    }
    let (Some(session_a), Some(session_b)) =
        (problem.session(a.session_id), problem.session(b.session_id))
    else {
        return false;
    };

    let before = score(state, problem.calendar);
    state.unindex(i);
    state.unindex(j);

    if !is_feasible(problem, session_a, b.cell, b.room_id, state) {
        state.reindex(i);
        state.reindex(j);
        return false;
    }
    state.set_position(i, b.cell, b.room_id);
    state.reindex(i);

    if !is_feasible(problem, session_b, a.cell, a.room_id, state) {
        state.unindex(i);
        state.set_position(i, a.cell, a.room_id);
        state.reindex(i);
        state.reindex(j);
        return false;
    }
    state.set_position(j, a.cell, a.room_id);
    state.reindex(j);

    if score(state, problem.calendar) > before {
        trace!("Swapped sessions {} and {}.", a.session_id, b.session_id);
        return true;
    }

    state.unindex(i);
    state.unindex(j);
    state.set_position(i, a.cell, a.room_id);
    state.set_position(j, b.cell, b.room_id);
    state.reindex(i);
    state.reindex(j);
    false
}

/// Moves assignment `i` to the vacant position with the largest strictly
/// positive score gain, if there is one.
fn move_to_best_vacancy(problem: &Problem<'_>, state: &mut PlacementState, i: usize) -> bool {
    let current = state.assignments()[i].clone();
    let Some(session) = problem.session(current.session_id) else {
        return false;
    };
    let counts = state.day_counts(problem.calendar.days.len());

    state.unindex(i);
    let mut best: Option<(i64, Cell, RoomId)> = None;
    for cell in problem.calendar.cells() {
        for room in problem.rooms.candidates_for(session.kind) {
            if cell == current.cell && room.id == current.room_id {
                continue;
            }
            let gain = relocation_delta(&counts, problem.calendar, current.cell, cell);
            if gain <= 0 || best.is_some_and(|(g, _, _)| g >= gain) {
                continue;
            }
            if is_feasible(problem, session, cell, room.id, state) {
                best = Some((gain, cell, room.id));
            }
        }
    }
    state.reindex(i);

    match best {
        Some((gain, cell, room_id)) => {
            trace!(
                "Moved session {} from {} to {} (+{}).",
                current.session_id, current.cell, cell, gain
            );
            state.relocate(i, cell, room_id);
            true
        }
        None => false,
    }
}
