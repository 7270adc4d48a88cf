use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::GenerationConfig;

// Type aliases for clarity
pub type SessionId = u32;
pub type RoomId = u32;
pub type GroupId = u32;
pub type TeacherId = u32;
pub type CourseId = u32;

/// Lecture-type sessions prefer large rooms, practical-type sessions standard ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Lecture,
    Practical,
}

fn one() -> u32 {
    1
}

/// A teaching meeting that needs a (day, slot, room).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub duration_minutes: u32,
    pub kind: SessionKind,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    /// Number of groups attending. Drives the lecture capacity requirement.
    #[serde(default = "one")]
    pub group_count: u32,
    #[serde(default)]
    pub course_id: Option<CourseId>,
}

impl Session {
    pub fn new(id: SessionId, kind: SessionKind) -> Self {
        Self {
            id,
            duration_minutes: 90,
            kind,
            teacher_id: None,
            group_id: None,
            group_count: 1,
            course_id: None,
        }
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn with_teacher(mut self, teacher_id: TeacherId) -> Self {
        self.teacher_id = Some(teacher_id);
        self
    }

    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn with_group_count(mut self, group_count: u32) -> Self {
        self.group_count = group_count;
        self
    }

    pub fn with_course(mut self, course_id: CourseId) -> Self {
        self.course_id = Some(course_id);
        self
    }
}

/// Represents a physical room. Capacity is optional; unknown capacity is never checked.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    #[serde(default)]
    pub capacity: Option<u32>,
}

impl Room {
    pub fn new(id: RoomId, name: impl Into<String>, capacity: Option<u32>) -> Self {
        Self {
            id,
            name: name.into(),
            capacity,
        }
    }
}

/// The two room pools a room can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomPool {
    Lecture,
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    /// Panics on out-of-range clock values; intended for literal grids.
    pub fn hm(start: (u32, u32), end: (u32, u32)) -> Self {
        let at = |(h, m): (u32, u32)| NaiveTime::from_hms_opt(h, m, 0).expect("valid clock time");
        Self {
            start: at(start),
            end: at(end),
        }
    }

    pub fn start_hour(&self) -> u32 {
        self.start.hour()
    }
}

/// Ordered days and ordered slots. Their product is the grid of schedulable cells.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub days: Vec<String>,
    pub slots: Vec<TimeSlot>,
}

impl Calendar {
    pub fn new(days: Vec<String>, slots: Vec<TimeSlot>) -> Self {
        Self { days, slots }
    }

    /// Five working days of five teaching slots.
    pub fn reference() -> Self {
        Self {
            days: ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            slots: vec![
                TimeSlot::hm((8, 0), (9, 30)),
                TimeSlot::hm((9, 30), (11, 0)),
                TimeSlot::hm((11, 0), (12, 30)),
                TimeSlot::hm((13, 30), (15, 0)),
                TimeSlot::hm((15, 0), (16, 30)),
            ],
        }
    }

    pub fn cell_count(&self) -> usize {
        self.days.len() * self.slots.len()
    }

    /// All cells, day-major.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.days.len())
            .flat_map(move |day| (0..self.slots.len()).map(move |slot| Cell { day, slot }))
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.day < self.days.len() && cell.slot < self.slots.len()
    }

    pub fn is_morning(&self, cell: Cell) -> bool {
        self.slots[cell.slot].start_hour() < 12
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::reference()
    }
}

/// Zero-based (day, slot) position in the calendar grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Cell {
    pub day: usize,
    pub slot: usize,
}

impl Cell {
    pub fn new(day: usize, slot: usize) -> Self {
        Self { day, slot }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day {} slot {}", self.day, self.slot)
    }
}

/// A session bound to a cell and a room. Group and teacher are copied from the
/// session so conflict checks never need to look it up again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub session_id: SessionId,
    pub cell: Cell,
    pub room_id: RoomId,
    pub group_id: Option<GroupId>,
    pub teacher_id: Option<TeacherId>,
}

impl Assignment {
    pub fn new(session: &Session, cell: Cell, room_id: RoomId) -> Self {
        Self {
            session_id: session.id,
            cell,
            room_id,
            group_id: session.group_id,
            teacher_id: session.teacher_id,
        }
    }
}

/// The complete input for one scheduling problem.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationInput {
    pub sessions: Vec<Session>,
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub calendar: Calendar,
    #[serde(default)]
    pub budget: GenerationConfig,
}

/// Persistence-ready record of one placed session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEntry {
    pub session_id: SessionId,
    pub day: String,
    pub day_index: usize,
    pub slot_index: usize,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub room_id: RoomId,
}

impl ScheduledEntry {
    pub fn from_assignment(assignment: &Assignment, calendar: &Calendar) -> Self {
        let slot = calendar.slots[assignment.cell.slot];
        Self {
            session_id: assignment.session_id,
            day: calendar.days[assignment.cell.day].clone(),
            day_index: assignment.cell.day,
            slot_index: assignment.cell.slot,
            start: slot.start,
            end: slot.end,
            room_id: assignment.room_id,
        }
    }

    pub fn cell(&self) -> Cell {
        Cell::new(self.day_index, self.slot_index)
    }
}

/// Describes a soft constraint that was not met in the final schedule.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetSoftConstraint {
    pub constraint_type: String,
    pub description: String,
}

impl fmt::Display for UnmetSoftConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.constraint_type, self.description)
    }
}

/// Operator-facing counts explaining a run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub lecture_sessions: usize,
    pub practical_sessions: usize,
    pub lecture_rooms: usize,
    pub standard_rooms: usize,
    pub grid_cells: usize,
    pub seed: u64,
    /// Sessions no room could ever hold under the capacity policy.
    pub unplaceable_sessions: usize,
    /// Sessions the conflict validator had to drop.
    pub dropped_by_validator: usize,
    pub score_after_placement: i64,
    pub score_after_improvement: i64,
    pub score_after_tabu: i64,
    /// Names of the stages that ran out of iterations.
    pub budget_exhausted: Vec<String>,
}

/// The final output of a generation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub placed: Vec<ScheduledEntry>,
    pub unplaced: Vec<SessionId>,
    pub quality_score: i64,
    pub diagnostics: Diagnostics,
    pub unmet_soft_constraints: Vec<UnmetSoftConstraint>,
}
