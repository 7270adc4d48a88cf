//! Mutable placement aggregate with per-cell occupancy indices.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use crate::data::{Assignment, Cell, GroupId, RoomId, SessionId, TeacherId};

/// Order-independent hash contribution of one placed session.
pub fn entry_hash(session_id: SessionId, cell: Cell, room_id: RoomId) -> u64 {
    let mut hasher = DefaultHasher::new();
    (session_id, cell.day, cell.slot, room_id).hash(&mut hasher);
    hasher.finish()
}

/// Assignments plus the (cell -> rooms/groups/teachers) indices that make
/// every exclusivity check O(1).
///
/// Invariant: within a cell, each room, group and teacher id appears at most
/// once among the indexed assignments.
#[derive(Debug, Clone, Default)]
pub struct PlacementState {
    assignments: Vec<Assignment>,
    rooms: HashMap<Cell, HashSet<RoomId>>,
    groups: HashMap<Cell, HashSet<GroupId>>,
    teachers: HashMap<Cell, HashSet<TeacherId>>,
    fingerprint: u64,
}

impl PlacementState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn into_assignments(self) -> Vec<Assignment> {
        self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// XOR of every assignment's [`entry_hash`]; equal placements hash equal
    /// whatever their list order.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn contains_session(&self, session_id: SessionId) -> bool {
        self.assignments.iter().any(|a| a.session_id == session_id)
    }

    pub fn room_free(&self, cell: Cell, room_id: RoomId) -> bool {
        !self.rooms.get(&cell).is_some_and(|set| set.contains(&room_id))
    }

    pub fn group_free(&self, cell: Cell, group_id: Option<GroupId>) -> bool {
        match group_id {
            Some(g) => !self.groups.get(&cell).is_some_and(|set| set.contains(&g)),
            None => true,
        }
    }

    pub fn teacher_free(&self, cell: Cell, teacher_id: Option<TeacherId>) -> bool {
        match teacher_id {
            Some(t) => !self.teachers.get(&cell).is_some_and(|set| set.contains(&t)),
            None => true,
        }
    }

    /// Appends an assignment the caller has already checked for feasibility.
    pub fn push(&mut self, assignment: Assignment) -> usize {
        self.assignments.push(assignment);
        let idx = self.assignments.len() - 1;
        self.reindex(idx);
        idx
    }

    /// Removes the most recent assignment. Used to undo a backtracking step.
    pub fn pop(&mut self) -> Option<Assignment> {
        let idx = self.assignments.len().checked_sub(1)?;
        self.unindex(idx);
        self.assignments.pop()
    }

    /// Removes the assignment at `idx`, keeping the order of the rest.
    pub fn remove(&mut self, idx: usize) -> Assignment {
        self.unindex(idx);
        self.assignments.remove(idx)
    }

    /// Puts an assignment back at `idx`, shifting later ones.
    pub fn insert(&mut self, idx: usize, assignment: Assignment) {
        self.assignments.insert(idx, assignment);
        self.reindex(idx);
    }

    /// Moves assignment `idx` to a new position. The caller has checked feasibility.
    pub fn relocate(&mut self, idx: usize, cell: Cell, room_id: RoomId) {
        self.unindex(idx);
        self.set_position(idx, cell, room_id);
        self.reindex(idx);
    }

    /// Indices of the assignments sitting in `cell`.
    pub fn occupants(&self, cell: Cell) -> Vec<usize> {
        self.assignments
            .iter()
            .enumerate()
            .filter(|(_, a)| a.cell == cell)
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of assignments on each day, for `days` days.
    pub fn day_counts(&self, days: usize) -> Vec<usize> {
        let mut counts = vec![0; days];
        for a in &self.assignments {
            if let Some(count) = counts.get_mut(a.cell.day) {
                *count += 1;
            }
        }
        counts
    }

    /// Takes assignment `idx` out of the occupancy indices while leaving it in
    /// the list. Must be paired with [`PlacementState::reindex`].
    pub(crate) fn unindex(&mut self, idx: usize) {
        let a = &self.assignments[idx];
        if let Some(set) = self.rooms.get_mut(&a.cell) {
            set.remove(&a.room_id);
        }
        if let (Some(g), Some(set)) = (a.group_id, self.groups.get_mut(&a.cell)) {
            set.remove(&g);
        }
        if let (Some(t), Some(set)) = (a.teacher_id, self.teachers.get_mut(&a.cell)) {
            set.remove(&t);
        }
        self.fingerprint ^= entry_hash(a.session_id, a.cell, a.room_id);
    }

    pub(crate) fn reindex(&mut self, idx: usize) {
        let a = &self.assignments[idx];
        self.rooms.entry(a.cell).or_default().insert(a.room_id);
        if let Some(g) = a.group_id {
            self.groups.entry(a.cell).or_default().insert(g);
        }
        if let Some(t) = a.teacher_id {
            self.teachers.entry(a.cell).or_default().insert(t);
        }
        self.fingerprint ^= entry_hash(a.session_id, a.cell, a.room_id);
    }

    /// Rewrites the position of an unindexed assignment.
    pub(crate) fn set_position(&mut self, idx: usize, cell: Cell, room_id: RoomId) {
        let a = &mut self.assignments[idx];
        a.cell = cell;
        a.room_id = room_id;
    }
}
