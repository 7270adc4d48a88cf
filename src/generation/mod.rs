//! Timetable generation: rank, place, refine, validate.

pub mod feasibility;
pub mod improve;
pub mod placer;
pub mod rank;
pub mod rooms;
pub mod score;
pub mod state;
pub mod tabu;
pub mod validate;

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::data::{
    Calendar, Diagnostics, GenerationInput, GenerationReport, Room, ScheduledEntry, Session,
    SessionId, SessionKind,
};
use crate::error::GenerationError;
use improve::LocalImprover;
use placer::BacktrackingPlacer;
use rooms::RoomPools;
use tabu::TabuOptimizer;

/// Read-only view of one scheduling problem shared by every stage.
#[derive(Debug, Clone)]
pub struct Problem<'a> {
    pub calendar: &'a Calendar,
    pub rooms: RoomPools<'a>,
    sessions: HashMap<SessionId, &'a Session>,
}

impl<'a> Problem<'a> {
    pub fn new(sessions: &'a [Session], rooms: &'a [Room], calendar: &'a Calendar) -> Self {
        Self {
            calendar,
            rooms: RoomPools::new(rooms),
            sessions: sessions.iter().map(|s| (s.id, s)).collect(),
        }
    }

    pub fn session(&self, id: SessionId) -> Option<&'a Session> {
        self.sessions.get(&id).copied()
    }
}

/// Rejects inputs no search should be attempted on.
pub fn validate_input(input: &GenerationInput) -> Result<(), GenerationError> {
    let invalid = |msg: String| Err(GenerationError::InputInvalid(msg));

    if input.sessions.is_empty() {
        return invalid("no sessions to schedule".to_string());
    }
    if input.rooms.is_empty() {
        return invalid("no rooms available".to_string());
    }
    if input.calendar.days.is_empty() || input.calendar.slots.is_empty() {
        return invalid("calendar grid is empty".to_string());
    }

    let mut session_ids = HashSet::new();
    for session in &input.sessions {
        if !session_ids.insert(session.id) {
            return invalid(format!("duplicate session id {}", session.id));
        }
        if session.group_count == 0 {
            return invalid(format!("session {} has a group count of zero", session.id));
        }
    }
    let mut room_ids = HashSet::new();
    for room in &input.rooms {
        if !room_ids.insert(room.id) {
            return invalid(format!("duplicate room id {}", room.id));
        }
    }
    for (i, slot) in input.calendar.slots.iter().enumerate() {
        if slot.end <= slot.start {
            return invalid(format!("time slot {} ends before it starts", i));
        }
    }
    Ok(())
}

/// Runs the whole pipeline on one problem.
///
/// Every input session ends up either in `placed` or in `unplaced`. The only
/// failures are invalid input and a schedule that still double-books after
/// validation.
pub fn generate(input: &GenerationInput) -> Result<GenerationReport, GenerationError> {
    let start_time = Instant::now();
    validate_input(input)?;

    let config = &input.budget;
    let calendar = &input.calendar;
    let seed = config.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let problem = Problem::new(&input.sessions, &input.rooms, calendar);

    let mut diagnostics = Diagnostics {
        lecture_sessions: count_kind(&input.sessions, SessionKind::Lecture),
        practical_sessions: count_kind(&input.sessions, SessionKind::Practical),
        lecture_rooms: problem.rooms.lecture().len(),
        standard_rooms: problem.rooms.standard().len(),
        grid_cells: calendar.cell_count(),
        seed,
        ..Diagnostics::default()
    };
    info!(
        "Generating timetable: {} sessions ({} lecture, {} practical), {} rooms ({} lecture, {} standard), {} cells, seed {}.",
        input.sessions.len(),
        diagnostics.lecture_sessions,
        diagnostics.practical_sessions,
        input.rooms.len(),
        diagnostics.lecture_rooms,
        diagnostics.standard_rooms,
        diagnostics.grid_cells,
        seed
    );

    // placement
    let ranked = rank::rank(&input.sessions);
    let placement = BacktrackingPlacer::new(&problem, config.placer_budget).place(&ranked, &mut rng);
    if placement.budget_exhausted {
        diagnostics.budget_exhausted.push("placer".to_string());
    }
    diagnostics.unplaceable_sessions = placement.unplaceable;
    let mut state = placement.state;
    diagnostics.score_after_placement = score::score(&state, calendar);
    info!(
        "Placed {} of {} sessions (score {}).",
        state.len(),
        input.sessions.len(),
        diagnostics.score_after_placement
    );

    // refinement
    let stats = LocalImprover::new(config.improver_iterations).improve(&problem, &mut state);
    if stats.exhausted {
        diagnostics.budget_exhausted.push("improver".to_string());
    }
    diagnostics.score_after_improvement = score::score(&state, calendar);

    let tabu = TabuOptimizer::new(config.tabu_iterations, config.tabu_tenure)
        .optimize(&problem, state, &mut rng);
    diagnostics.score_after_tabu = tabu.best_score;
    info!(
        "Refinement raised the score to {} (local {}, tabu {} iterations).",
        tabu.best_score, diagnostics.score_after_improvement, tabu.iterations
    );

    // validation
    let resolution = validate::resolve(&problem, tabu.best.assignments());
    validate::verify(&resolution.assignments)?;
    diagnostics.dropped_by_validator = resolution.dropped.len();

    let mut unplaced = placement.unplaced;
    unplaced.extend(resolution.dropped);
    if !unplaced.is_empty() {
        warn!("{} sessions could not be placed: {:?}", unplaced.len(), unplaced);
    }

    let quality_score = score::score_assignments(&resolution.assignments, calendar);
    let unmet_soft_constraints = score::unmet_soft_constraints(&resolution.assignments, calendar);
    let mut placed: Vec<ScheduledEntry> = resolution
        .assignments
        .iter()
        .map(|a| ScheduledEntry::from_assignment(a, calendar))
        .collect();
    placed.sort_by_key(|e| (e.day_index, e.slot_index, e.room_id, e.session_id));

    info!(
        "Generation finished in {:.2?}: {} placed, {} unplaced, score {}.",
        start_time.elapsed(),
        placed.len(),
        unplaced.len(),
        quality_score
    );

    Ok(GenerationReport {
        placed,
        unplaced,
        quality_score,
        diagnostics,
        unmet_soft_constraints,
    })
}

fn count_kind(sessions: &[Session], kind: SessionKind) -> usize {
    sessions.iter().filter(|s| s.kind == kind).count()
}
