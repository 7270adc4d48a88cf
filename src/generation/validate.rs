//! Last pass before persistence: replays a schedule, repairs what it can and
//! drops what it cannot, then re-checks the result.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::data::{Assignment, Cell, Room, Session, SessionId};
use crate::error::GenerationError;
use crate::generation::Problem;
use crate::generation::feasibility::{capacity_fits, is_feasible};
use crate::generation::state::PlacementState;

/// Output of [`resolve`].
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub assignments: Vec<Assignment>,
    pub relocated: Vec<SessionId>,
    pub dropped: Vec<SessionId>,
}

/// Replays `incoming` in order against fresh occupancy indices.
///
/// Entries that still fit are kept as they are. A conflicting entry is first
/// moved to any free position on the grid; failing that, the entries
/// blocking one of its positions are moved away (one level deep, restored if
/// any of them cannot move). Entries that still do not fit are dropped.
/// Entries for unknown or already-seen session ids are discarded unreported.
pub fn resolve(problem: &Problem<'_>, incoming: &[Assignment]) -> Resolution {
    let mut state = PlacementState::new();
    let mut seen = HashSet::new();
    let mut resolution = Resolution::default();

    for entry in incoming {
        let Some(session) = problem.session(entry.session_id) else {
            warn!("Dropping assignment for unknown session {}.", entry.session_id);
            continue;
        };
        if !seen.insert(session.id) {
            warn!("Dropping repeated assignment for session {}.", session.id);
            continue;
        }

        if is_feasible(problem, session, entry.cell, entry.room_id, &state) {
            state.push(Assignment::new(session, entry.cell, entry.room_id));
            continue;
        }

        debug!("Session {} conflicts at {}; relocating.", session.id, entry.cell);
        if place_anywhere(problem, session, &mut state) || evict_and_place(problem, session, &mut state)
        {
            resolution.relocated.push(session.id);
            continue;
        }

        warn!("Session {} cannot be accommodated; dropping it.", session.id);
        resolution.dropped.push(session.id);
    }

    if !resolution.relocated.is_empty() || !resolution.dropped.is_empty() {
        info!(
            "Conflict validator relocated {} and dropped {} sessions.",
            resolution.relocated.len(),
            resolution.dropped.len()
        );
    }
    resolution.assignments = state.into_assignments();
    resolution
}

/// First free position in grid order, kind-matched rooms first.
fn place_anywhere(problem: &Problem<'_>, session: &Session, state: &mut PlacementState) -> bool {
    for cell in problem.calendar.cells() {
        for room in problem.rooms.candidates_for(session.kind) {
            if is_feasible(problem, session, cell, room.id, state) {
                state.push(Assignment::new(session, cell, room.id));
                return true;
            }
        }
    }
    false
}

fn blocks(a: &Assignment, session: &Session, cell: Cell, room: &Room) -> bool {
    a.cell == cell
        && (a.room_id == room.id
            || (session.group_id.is_some() && a.group_id == session.group_id)
            || (session.teacher_id.is_some() && a.teacher_id == session.teacher_id))
}

/// Frees a position for `session` by moving its blockers elsewhere.
fn evict_and_place(problem: &Problem<'_>, session: &Session, state: &mut PlacementState) -> bool {
    for cell in problem.calendar.cells() {
        for room in problem.rooms.candidates_for(session.kind) {
            if !capacity_fits(session, room) {
                continue;
            }
            let blockers: Vec<usize> = state
                .assignments()
                .iter()
                .enumerate()
                .filter(|(_, a)| blocks(a, session, cell, room))
                .map(|(i, _)| i)
                .collect();
            if blockers.is_empty() {
                continue;
            }
            if try_eviction(problem, session, cell, room, &blockers, state) {
                return true;
            }
        }
    }
    false
}

fn try_eviction(
    problem: &Problem<'_>,
    session: &Session,
    cell: Cell,
    room: &Room,
    blockers: &[usize],
    state: &mut PlacementState,
) -> bool {
    // remove from the back so earlier indices stay valid
    let mut evicted: Vec<(usize, Assignment)> = blockers
        .iter()
        .rev()
        .map(|&idx| (idx, state.remove(idx)))
        .collect();
    evicted.reverse();

    let mut pushed = 0;
    let mut ok = is_feasible(problem, session, cell, room.id, state);
    if ok {
        state.push(Assignment::new(session, cell, room.id));
        pushed += 1;
        for (_, blocker) in &evicted {
            let moved = problem
                .session(blocker.session_id)
                .is_some_and(|s| place_anywhere(problem, s, state));
            if !moved {
                ok = false;
                break;
            }
            pushed += 1;
        }
    }

    if ok {
        debug!(
            "Placed session {} at {} by moving {} blockers.",
            session.id,
            cell,
            evicted.len()
        );
        return true;
    }

    for _ in 0..pushed {
        state.pop();
    }
    for (idx, blocker) in evicted {
        state.insert(idx, blocker);
    }
    false
}

/// Every double booking in `assignments`, as human-readable messages.
pub fn conflicts(assignments: &[Assignment]) -> Vec<String> {
    let mut sessions = HashSet::new();
    let mut rooms = HashSet::new();
    let mut groups = HashSet::new();
    let mut teachers = HashSet::new();
    let mut found = Vec::new();

    for a in assignments {
        if !sessions.insert(a.session_id) {
            found.push(format!("session {} is placed more than once", a.session_id));
        }
        if !rooms.insert((a.cell, a.room_id)) {
            found.push(format!("room {} is double-booked at {}", a.room_id, a.cell));
        }
        if let Some(g) = a.group_id {
            if !groups.insert((a.cell, g)) {
                found.push(format!("group {} is double-booked at {}", g, a.cell));
            }
        }
        if let Some(t) = a.teacher_id {
            if !teachers.insert((a.cell, t)) {
                found.push(format!("teacher {} is double-booked at {}", t, a.cell));
            }
        }
    }
    found
}

/// Fails if any room, group or teacher is booked twice in one cell.
pub fn verify(assignments: &[Assignment]) -> Result<(), GenerationError> {
    let found = conflicts(assignments);
    if found.is_empty() {
        Ok(())
    } else {
        Err(GenerationError::InvariantViolation(found.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Calendar, SessionKind};

    fn grid(days: usize, slots: usize) -> Calendar {
        let all = Calendar::reference();
        Calendar::new(all.days[..days].to_vec(), all.slots[..slots].to_vec())
    }

    fn raw(session: &Session, day: usize, slot: usize, room: u32) -> Assignment {
        Assignment::new(session, Cell::new(day, slot), room)
    }

    #[test]
    fn valid_list_is_a_fixed_point() {
        let sessions: Vec<_> = (1..=4)
            .map(|id| Session::new(id, SessionKind::Practical).with_group(id).with_teacher(id))
            .collect();
        let rooms = vec![Room::new(1, "A", None), Room::new(2, "B", None)];
        let calendar = Calendar::reference();
        let problem = Problem::new(&sessions, &rooms, &calendar);
        let incoming = vec![
            raw(&sessions[0], 0, 0, 1),
            raw(&sessions[1], 0, 0, 2),
            raw(&sessions[2], 1, 3, 1),
            raw(&sessions[3], 4, 4, 2),
        ];

        let first = resolve(&problem, &incoming);
        let second = resolve(&problem, &first.assignments);

        assert_eq!(first.assignments, incoming);
        assert_eq!(second.assignments, first.assignments);
        assert!(first.dropped.is_empty());
        assert!(first.relocated.is_empty());
    }

    #[test]
    fn relocates_a_room_clash() {
        let sessions = vec![
            Session::new(1, SessionKind::Practical).with_group(1),
            Session::new(2, SessionKind::Practical).with_group(2),
        ];
        let rooms = vec![Room::new(1, "A", None)];
        let calendar = grid(1, 2);
        let problem = Problem::new(&sessions, &rooms, &calendar);
        let incoming = vec![raw(&sessions[0], 0, 0, 1), raw(&sessions[1], 0, 0, 1)];

        let resolution = resolve(&problem, &incoming);

        assert_eq!(resolution.relocated, vec![2]);
        assert_eq!(resolution.assignments[1].cell, Cell::new(0, 1));
        assert!(verify(&resolution.assignments).is_ok());
    }

    #[test]
    fn evicts_a_movable_blocker() {
        // session 1 can use either room, session 2 only fits the amphi
        let sessions = vec![
            Session::new(1, SessionKind::Practical).with_group(1),
            Session::new(2, SessionKind::Lecture).with_group(2).with_group_count(4),
        ];
        let rooms = vec![Room::new(1, "Amphi", Some(150)), Room::new(2, "Room", Some(30))];
        let calendar = grid(1, 1);
        let problem = Problem::new(&sessions, &rooms, &calendar);
        let incoming = vec![raw(&sessions[0], 0, 0, 1), raw(&sessions[1], 0, 0, 1)];

        let resolution = resolve(&problem, &incoming);

        assert!(resolution.dropped.is_empty());
        assert_eq!(resolution.assignments.len(), 2);
        let lecture = resolution.assignments.iter().find(|a| a.session_id == 2);
        assert_eq!(lecture.map(|a| a.room_id), Some(1));
        assert!(verify(&resolution.assignments).is_ok());
    }

    #[test]
    fn drops_what_cannot_fit_and_restores_blockers() {
        let sessions = vec![
            Session::new(1, SessionKind::Practical).with_group(1),
            Session::new(2, SessionKind::Practical).with_group(1),
        ];
        let rooms = vec![Room::new(1, "A", None), Room::new(2, "B", None)];
        let calendar = grid(1, 1);
        let problem = Problem::new(&sessions, &rooms, &calendar);
        let incoming = vec![raw(&sessions[0], 0, 0, 1), raw(&sessions[1], 0, 0, 2)];

        let resolution = resolve(&problem, &incoming);

        assert_eq!(resolution.dropped, vec![2]);
        assert_eq!(resolution.assignments, vec![incoming[0].clone()]);
    }

    #[test]
    fn drops_unknown_and_repeated_sessions() {
        let sessions = vec![Session::new(1, SessionKind::Practical)];
        let rooms = vec![Room::new(1, "A", None)];
        let calendar = Calendar::reference();
        let problem = Problem::new(&sessions, &rooms, &calendar);
        let ghost = Session::new(9, SessionKind::Practical);
        let incoming = vec![
            raw(&sessions[0], 0, 0, 1),
            raw(&sessions[0], 1, 0, 1),
            raw(&ghost, 2, 0, 1),
        ];

        let resolution = resolve(&problem, &incoming);

        assert_eq!(resolution.assignments.len(), 1);
        assert!(resolution.dropped.is_empty());
    }

    #[test]
    fn rebuilds_stale_denormalised_fields() {
        let sessions = vec![Session::new(1, SessionKind::Practical).with_group(4).with_teacher(8)];
        let rooms = vec![Room::new(1, "A", None)];
        let calendar = Calendar::reference();
        let problem = Problem::new(&sessions, &rooms, &calendar);
        let stale = raw(&Session::new(1, SessionKind::Practical), 0, 0, 1);

        let resolution = resolve(&problem, &[stale]);

        assert_eq!(resolution.assignments[0].group_id, Some(4));
        assert_eq!(resolution.assignments[0].teacher_id, Some(8));
    }

    #[test]
    fn verify_reports_every_kind_of_double_booking() {
        let a = Session::new(1, SessionKind::Practical).with_group(1).with_teacher(1);
        let b = Session::new(2, SessionKind::Practical).with_group(1).with_teacher(1);
        let list = vec![raw(&a, 0, 0, 1), raw(&b, 0, 0, 1)];

        let found = conflicts(&list);
        assert_eq!(found.len(), 3);

        match verify(&list) {
            Err(GenerationError::InvariantViolation(msg)) => {
                assert!(msg.contains("room 1"));
                assert!(msg.contains("group 1"));
                assert!(msg.contains("teacher 1"));
            }
            other => panic!("expected invariant violation, got {:?}", other),
        }
    }

    #[test]
    fn null_group_and_teacher_never_clash() {
        let a = Session::new(1, SessionKind::Practical);
        let b = Session::new(2, SessionKind::Practical);
        let list = vec![raw(&a, 0, 0, 1), raw(&b, 0, 0, 2)];
        assert!(verify(&list).is_ok());
    }
}
