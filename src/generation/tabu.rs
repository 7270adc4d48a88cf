//! Tabu search over single-assignment relocations.
//!
//! Each iteration scans every feasible move of one assignment to a vacant
//! (cell, room), skips moves whose resulting placement fingerprint is in the
//! tabu list, and takes the best remaining one even if it loses score. The
//! best placement seen over the whole run is returned.

use std::collections::VecDeque;

use log::{debug, trace};
use rand::Rng;

use crate::data::{Cell, RoomId};
use crate::generation::Problem;
use crate::generation::feasibility::is_feasible;
use crate::generation::score::{relocation_delta, score};
use crate::generation::state::{PlacementState, entry_hash};

/// Bounded recency list of placement fingerprints.
#[derive(Debug, Clone)]
pub struct TabuList {
    capacity: usize,
    entries: VecDeque<u64>,
}

impl TabuList {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Records a fingerprint, evicting the oldest once over capacity.
    pub fn push(&mut self, fingerprint: u64) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_back(fingerprint);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn contains(&self, fingerprint: u64) -> bool {
        self.entries.contains(&fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Move {
    idx: usize,
    cell: Cell,
    room_id: RoomId,
    delta: i64,
    fingerprint: u64,
}

#[derive(Debug, Clone)]
pub struct TabuOutcome {
    pub best: PlacementState,
    pub best_score: i64,
    pub iterations: usize,
}

pub struct TabuOptimizer {
    iterations: usize,
    tenure: usize,
}

impl TabuOptimizer {
    pub fn new(iterations: usize, tenure: usize) -> Self {
        Self { iterations, tenure }
    }

    pub fn optimize<R: Rng>(
        &self,
        problem: &Problem<'_>,
        initial: PlacementState,
        rng: &mut R,
    ) -> TabuOutcome {
        let mut tabu = TabuList::new(self.tenure);
        tabu.push(initial.fingerprint());

        let mut current_score = score(&initial, problem.calendar);
        let mut best_score = current_score;
        let mut best = initial.clone();
        let mut current = initial;
        let mut iterations = 0;

        while iterations < self.iterations {
            let Some(step) = best_move(problem, &mut current, &tabu, rng) else {
                debug!("Tabu search found no admissible neighbour after {} iterations.", iterations);
                break;
            };
            iterations += 1;

            current.relocate(step.idx, step.cell, step.room_id);
            current_score += step.delta;
            tabu.push(step.fingerprint);
            trace!(
                "Tabu iteration {}: moved assignment {} to {} ({:+}), score {}.",
                iterations, step.idx, step.cell, step.delta, current_score
            );

            if current_score > best_score {
                best_score = current_score;
                best = current.clone();
            }
        }

        debug!(
            "Tabu search ran {} iterations, best score {}.",
            iterations, best_score
        );
        TabuOutcome {
            best,
            best_score,
            iterations,
        }
    }
}

/// Highest-delta non-tabu relocation. Ties are broken uniformly at random.
fn best_move<R: Rng>(
    problem: &Problem<'_>,
    state: &mut PlacementState,
    tabu: &TabuList,
    rng: &mut R,
) -> Option<Move> {
    let counts = state.day_counts(problem.calendar.days.len());
    let fingerprint = state.fingerprint();
    let mut chosen: Option<Move> = None;
    let mut ties = 0u32;

    for idx in 0..state.len() {
        let current = state.assignments()[idx].clone();
        let Some(session) = problem.session(current.session_id) else {
            continue;
        };
        let leaving = entry_hash(current.session_id, current.cell, current.room_id);

        state.unindex(idx);
        for cell in problem.calendar.cells() {
            for room in problem.rooms.candidates_for(session.kind) {
                if cell == current.cell && room.id == current.room_id {
                    continue;
                }
                if !is_feasible(problem, session, cell, room.id, state) {
                    continue;
                }
                let next = fingerprint ^ leaving ^ entry_hash(current.session_id, cell, room.id);
                if tabu.contains(next) {
                    continue;
                }
                let candidate = Move {
                    idx,
                    cell,
                    room_id: room.id,
                    delta: relocation_delta(&counts, problem.calendar, current.cell, cell),
                    fingerprint: next,
                };
                match chosen {
                    Some(m) if m.delta > candidate.delta => {}
                    Some(m) if m.delta == candidate.delta => {
                        ties += 1;
                        if rng.random_range(0..=ties) == 0 {
                            chosen = Some(candidate);
                        }
                    }
                    _ => {
                        ties = 0;
                        chosen = Some(candidate);
                    }
                }
            }
        }
        state.reindex(idx);
    }
    chosen
}
