//! Quality score both refinement stages maximise.
//!
//! `100 * placed - 10 * sum(max(0, per_day - 3)) + 5 * morning_assignments`

use itertools::Itertools;

use crate::data::{Assignment, Calendar, Cell, UnmetSoftConstraint};
use crate::generation::state::PlacementState;

pub const PLACED_REWARD: i64 = 100;
pub const DAY_LOAD_LIMIT: usize = 3;
pub const OVERLOAD_PENALTY: i64 = 10;
pub const MORNING_BONUS: i64 = 5;

fn overload(count: usize) -> i64 {
    count.saturating_sub(DAY_LOAD_LIMIT) as i64
}

fn morning(calendar: &Calendar, cell: Cell) -> i64 {
    if calendar.is_morning(cell) { MORNING_BONUS } else { 0 }
}

pub fn score(state: &PlacementState, calendar: &Calendar) -> i64 {
    score_assignments(state.assignments(), calendar)
}

pub fn score_assignments(assignments: &[Assignment], calendar: &Calendar) -> i64 {
    let placed = assignments.len() as i64 * PLACED_REWARD;
    let overloaded: i64 = assignments
        .iter()
        .counts_by(|a| a.cell.day)
        .values()
        .map(|&count| overload(count))
        .sum();
    let mornings: i64 = assignments.iter().map(|a| morning(calendar, a.cell)).sum();
    placed - overloaded * OVERLOAD_PENALTY + mornings
}

/// Score change from moving one assignment from `from` to `to`, given the
/// current per-day counts.
pub fn relocation_delta(day_counts: &[usize], calendar: &Calendar, from: Cell, to: Cell) -> i64 {
    let mut delta = morning(calendar, to) - morning(calendar, from);
    if from.day != to.day {
        let src = day_counts[from.day];
        let dst = day_counts[to.day];
        let penalty_change = (overload(src.saturating_sub(1)) - overload(src))
            + (overload(dst + 1) - overload(dst));
        delta -= penalty_change * OVERLOAD_PENALTY;
    }
    delta
}

/// Lists the soft preferences the schedule does not meet.
pub fn unmet_soft_constraints(
    assignments: &[Assignment],
    calendar: &Calendar,
) -> Vec<UnmetSoftConstraint> {
    let mut unmet = Vec::new();

    // days carrying more sessions than the load limit
    for (day, count) in assignments.iter().counts_by(|a| a.cell.day).into_iter().sorted() {
        if count > DAY_LOAD_LIMIT {
            unmet.push(UnmetSoftConstraint {
                constraint_type: "Overloaded Day".to_string(),
                description: format!(
                    "{} carries {} sessions, more than the preferred {}.",
                    calendar.days[day], count, DAY_LOAD_LIMIT
                ),
            });
        }
    }

    // prefer morning slots
    for a in assignments {
        if !calendar.is_morning(a.cell) {
            let slot = calendar.slots[a.cell.slot];
            unmet.push(UnmetSoftConstraint {
                constraint_type: "Prefer Mornings".to_string(),
                description: format!(
                    "Session {} is scheduled on {} at {}, which is not in the morning.",
                    a.session_id,
                    calendar.days[a.cell.day],
                    slot.start.format("%H:%M")
                ),
            });
        }
    }

    unmet
}
