//! The admissibility predicate every placement goes through.

use crate::data::{Cell, Room, RoomId, Session, SessionKind};
use crate::generation::Problem;
use crate::generation::state::PlacementState;

/// Seats expected per attending group.
pub const SEATS_PER_GROUP: u32 = 25;

/// Seats a session needs: one block per group for lectures, a single block for practicals.
pub fn required_capacity(session: &Session) -> u32 {
    match session.kind {
        SessionKind::Lecture => session.group_count.saturating_mul(SEATS_PER_GROUP),
        SessionKind::Practical => SEATS_PER_GROUP,
    }
}

/// Capacity policy. Rooms with unknown capacity always fit.
pub fn capacity_fits(session: &Session, room: &Room) -> bool {
    match room.capacity {
        Some(capacity) => capacity >= required_capacity(session),
        None => true,
    }
}

/// True when `session` may take `room_id` at `cell` given what is already placed.
///
/// Checks, in order: the cell is on the grid, the room is known, the room is
/// large enough, and the room, group and teacher are all free at that cell.
/// Either room pool is acceptable; pool preference is the placer's concern.
pub fn is_feasible(
    problem: &Problem<'_>,
    session: &Session,
    cell: Cell,
    room_id: RoomId,
    state: &PlacementState,
) -> bool {
    if !problem.calendar.contains(cell) {
        return false;
    }
    let Some(room) = problem.rooms.get(room_id) else {
        return false;
    };
    if !capacity_fits(session, room) {
        return false;
    }
    state.room_free(cell, room_id)
        && state.group_free(cell, session.group_id)
        && state.teacher_free(cell, session.teacher_id)
}

/// True when at least one known room can ever hold the session.
pub fn has_capable_room(problem: &Problem<'_>, session: &Session) -> bool {
    problem
        .rooms
        .candidates_for(session.kind)
        .any(|room| capacity_fits(session, room))
}
