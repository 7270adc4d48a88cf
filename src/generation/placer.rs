//! Depth-first backtracking placement over ranked sessions.

use log::{debug, trace, warn};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::data::{Assignment, Cell, Room, Session, SessionId};
use crate::generation::Problem;
use crate::generation::feasibility::{has_capable_room, is_feasible};
use crate::generation::state::PlacementState;

/// Result of one recursive step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Search {
    Solved,
    NoSolution,
    Exhausted,
}

/// What the placer hands to the refinement stages.
#[derive(Debug, Clone)]
pub struct PlacementOutcome {
    pub state: PlacementState,
    /// Sessions left out, in rank order.
    pub unplaced: Vec<SessionId>,
    /// Sessions no room can hold under the capacity policy.
    pub unplaceable: usize,
    /// True when backtracking bound every session.
    pub complete: bool,
    pub budget_exhausted: bool,
}

/// First-fit backtracking search bounded by a call budget.
pub struct BacktrackingPlacer<'p, 'a> {
    problem: &'p Problem<'a>,
    budget: u64,
    best: PlacementState,
}

impl<'p, 'a> BacktrackingPlacer<'p, 'a> {
    pub fn new(problem: &'p Problem<'a>, budget: u64) -> Self {
        Self {
            problem,
            budget,
            best: PlacementState::new(),
        }
    }

    /// Places `ranked` sessions in order.
    ///
    /// When backtracking cannot bind every session, the deepest partial
    /// placement seen is kept and the missing sessions get one first-fit
    /// attempt each; whatever still does not fit is reported unplaced.
    pub fn place<R: Rng>(mut self, ranked: &[&'a Session], rng: &mut R) -> PlacementOutcome {
        let (searchable, hopeless): (Vec<&Session>, Vec<&Session>) = ranked
            .iter()
            .copied()
            .partition(|s| has_capable_room(self.problem, s));
        for session in &hopeless {
            warn!(
                "Session {} fits no room under the capacity policy; leaving it unplaced.",
                session.id
            );
        }

        let budget = self.budget;
        let mut state = PlacementState::new();
        let outcome = self.search(&searchable, &mut state, rng);
        let used = budget - self.budget;
        debug!("Backtracking finished with {:?} after {} calls.", outcome, used);

        let complete = outcome == Search::Solved;
        let budget_exhausted = outcome == Search::Exhausted;
        if budget_exhausted {
            warn!("Placer budget of {} calls exhausted; keeping best partial placement.", budget);
        }

        let mut state = if complete { state } else { self.best };
        let mut unplaced = Vec::new();
        if !complete {
            for session in &searchable {
                if state.contains_session(session.id) {
                    continue;
                }
                if !first_fit(self.problem, session, &mut state, rng) {
                    unplaced.push(session.id);
                }
            }
        }
        unplaced.extend(hopeless.iter().map(|s| s.id));

        PlacementOutcome {
            state,
            unplaced,
            unplaceable: hopeless.len(),
            complete,
            budget_exhausted,
        }
    }

    fn search<R: Rng>(
        &mut self,
        remaining: &[&'a Session],
        state: &mut PlacementState,
        rng: &mut R,
    ) -> Search {
        if self.budget == 0 {
            return Search::Exhausted;
        }
        self.budget -= 1;
        if state.len() > self.best.len() {
            self.best = state.clone();
        }

        let Some((head, tail)) = remaining.split_first() else {
            return Search::Solved;
        };

        let cells = shuffled_cells(self.problem, rng);
        let rooms = shuffled_rooms(self.problem, head, rng);

        for &cell in &cells {
            for room in &rooms {
                if !is_feasible(self.problem, head, cell, room.id, state) {
                    continue;
                }
                trace!("Trying session {} at {} in room {}.", head.id, cell, room.id);
                state.push(Assignment::new(head, cell, room.id));
                match self.search(tail, state, rng) {
                    Search::Solved => return Search::Solved,
                    Search::Exhausted => {
                        state.pop();
                        return Search::Exhausted;
                    }
                    Search::NoSolution => {
                        state.pop();
                    }
                }
            }
        }
        Search::NoSolution
    }
}

fn shuffled_cells<R: Rng>(problem: &Problem<'_>, rng: &mut R) -> Vec<Cell> {
    let mut cells: Vec<Cell> = problem.calendar.cells().collect();
    cells.shuffle(rng);
    cells
}

/// Kind-matched rooms in random order, then the fallback pool in random order.
fn shuffled_rooms<'a, R: Rng>(problem: &Problem<'a>, session: &Session, rng: &mut R) -> Vec<&'a Room> {
    let mut primary = problem.rooms.primary_for(session.kind).to_vec();
    let mut secondary = problem.rooms.secondary_for(session.kind).to_vec();
    primary.shuffle(rng);
    secondary.shuffle(rng);
    primary.extend(secondary);
    primary
}

/// Puts `session` in the first feasible position found, if any.
pub fn first_fit<R: Rng>(
    problem: &Problem<'_>,
    session: &Session,
    state: &mut PlacementState,
    rng: &mut R,
) -> bool {
    let cells = shuffled_cells(problem, rng);
    let rooms = shuffled_rooms(problem, session, rng);
    for &cell in &cells {
        for room in &rooms {
            if is_feasible(problem, session, cell, room.id, state) {
                state.push(Assignment::new(session, cell, room.id));
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Calendar, Room, SessionKind, TimeSlot};
    use crate::generation::rank::rank;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn single_cell() -> Calendar {
        Calendar::new(vec!["Monday".into()], vec![TimeSlot::hm((8, 0), (9, 30))])
    }

    #[test]
    fn places_everything_when_grid_allows() {
        let sessions: Vec<_> = (1..=10)
            .map(|id| Session::new(id, SessionKind::Lecture).with_group(id))
            .collect();
        let rooms = vec![Room::new(1, "Amphi", Some(200))];
        let calendar = Calendar::reference();
        let problem = Problem::new(&sessions, &rooms, &calendar);
        let mut rng = StdRng::seed_from_u64(7);

        let outcome = BacktrackingPlacer::new(&problem, 50_000).place(&rank(&sessions), &mut rng);

        assert!(outcome.complete);
        assert!(outcome.unplaced.is_empty());
        assert_eq!(outcome.state.len(), 10);
    }

    #[test]
    fn group_clash_leaves_one_unplaced() {
        let sessions = vec![
            Session::new(1, SessionKind::Practical).with_group(3),
            Session::new(2, SessionKind::Practical).with_group(3),
        ];
        let rooms = vec![Room::new(1, "A", None), Room::new(2, "B", None)];
        let calendar = single_cell();
        let problem = Problem::new(&sessions, &rooms, &calendar);
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = BacktrackingPlacer::new(&problem, 50_000).place(&rank(&sessions), &mut rng);

        assert!(!outcome.complete);
        assert!(!outcome.budget_exhausted);
        assert_eq!(outcome.state.len(), 1);
        assert_eq!(outcome.unplaced.len(), 1);
    }

    #[test]
    fn backtracks_to_a_full_solution() {
        // The big lecture only fits the amphi; the practical fits either room.
        let sessions = vec![
            Session::new(1, SessionKind::Practical).with_group(1),
            Session::new(2, SessionKind::Lecture).with_group(2).with_group_count(4),
        ];
        let rooms = vec![Room::new(1, "Amphi", Some(150)), Room::new(2, "Room", Some(30))];
        let calendar = single_cell();
        let problem = Problem::new(&sessions, &rooms, &calendar);
        let mut rng = StdRng::seed_from_u64(3);

        // place the practical first so it may grab the amphi and force a backtrack
        let order: Vec<&Session> = sessions.iter().collect();
        let outcome = BacktrackingPlacer::new(&problem, 50_000).place(&order, &mut rng);

        assert!(outcome.complete);
        let lecture = outcome
            .state
            .assignments()
            .iter()
            .find(|a| a.session_id == 2)
            .map(|a| a.room_id);
        assert_eq!(lecture, Some(1));
    }

    #[test]
    fn zero_budget_falls_back_to_first_fit() {
        let sessions: Vec<_> = (1..=3)
            .map(|id| Session::new(id, SessionKind::Practical).with_group(id))
            .collect();
        let rooms = vec![Room::new(1, "Room", None)];
        let calendar = Calendar::reference();
        let problem = Problem::new(&sessions, &rooms, &calendar);
        let mut rng = StdRng::seed_from_u64(11);

        let outcome = BacktrackingPlacer::new(&problem, 0).place(&rank(&sessions), &mut rng);

        assert!(outcome.budget_exhausted);
        assert_eq!(outcome.state.len(), 3);
        assert!(outcome.unplaced.is_empty());
    }

    #[test]
    fn capacity_hopeless_session_is_reported() {
        let sessions = vec![Session::new(1, SessionKind::Practical)];
        let rooms = vec![Room::new(1, "Small", Some(10))];
        let calendar = Calendar::reference();
        let problem = Problem::new(&sessions, &rooms, &calendar);
        let mut rng = StdRng::seed_from_u64(5);

        let outcome = BacktrackingPlacer::new(&problem, 50_000).place(&rank(&sessions), &mut rng);

        assert_eq!(outcome.unplaced, vec![1]);
        assert_eq!(outcome.unplaceable, 1);
        assert!(outcome.state.is_empty());
    }
}
