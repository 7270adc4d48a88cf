//! Room classification into lecture-capable and standard pools.

use std::collections::HashMap;

use crate::data::{Room, RoomId, RoomPool, SessionKind};

/// Seating capacity from which a room counts as lecture-capable regardless of its name.
pub const LECTURE_CAPACITY: u32 = 100;

/// Lowercase name fragments identifying lecture venues.
const LECTURE_VOCABULARY: [&str; 4] = ["amphi", "auditor", "lecture hall", "aula"];

/// Pool a single room belongs to.
pub fn room_pool(room: &Room) -> RoomPool {
    let name = room.name.to_lowercase();
    let by_name = LECTURE_VOCABULARY.iter().any(|word| name.contains(word));
    let by_capacity = room.capacity.is_some_and(|c| c >= LECTURE_CAPACITY);
    if by_name || by_capacity {
        RoomPool::Lecture
    } else {
        RoomPool::Standard
    }
}

/// Splits rooms into `(lecture, standard)`. Every room lands in exactly one pool.
pub fn classify(rooms: &[Room]) -> (Vec<&Room>, Vec<&Room>) {
    rooms
        .iter()
        .partition(|room| room_pool(room) == RoomPool::Lecture)
}

/// Both pools plus an id lookup, built once per run.
#[derive(Debug, Clone)]
pub struct RoomPools<'a> {
    lecture: Vec<&'a Room>,
    standard: Vec<&'a Room>,
    by_id: HashMap<RoomId, (&'a Room, RoomPool)>,
}

impl<'a> RoomPools<'a> {
    pub fn new(rooms: &'a [Room]) -> Self {
        let (lecture, standard) = classify(rooms);
        let by_id = lecture
            .iter()
            .map(|r| (r.id, (*r, RoomPool::Lecture)))
            .chain(standard.iter().map(|r| (r.id, (*r, RoomPool::Standard))))
            .collect();
        Self {
            lecture,
            standard,
            by_id,
        }
    }

    pub fn get(&self, id: RoomId) -> Option<&'a Room> {
        self.by_id.get(&id).map(|(room, _)| *room)
    }

    pub fn pool_of(&self, id: RoomId) -> Option<RoomPool> {
        self.by_id.get(&id).map(|(_, pool)| *pool)
    }

    pub fn lecture(&self) -> &[&'a Room] {
        &self.lecture
    }

    pub fn standard(&self) -> &[&'a Room] {
        &self.standard
    }

    /// The kind-matched pool.
    pub fn primary_for(&self, kind: SessionKind) -> &[&'a Room] {
        match kind {
            SessionKind::Lecture => &self.lecture,
            SessionKind::Practical => &self.standard,
        }
    }

    /// The fallback pool.
    pub fn secondary_for(&self, kind: SessionKind) -> &[&'a Room] {
        match kind {
            SessionKind::Lecture => &self.standard,
            SessionKind::Practical => &self.lecture,
        }
    }

    /// Primary rooms first, then secondary.
    pub fn candidates_for(&self, kind: SessionKind) -> impl Iterator<Item = &'a Room> + '_ {
        self.primary_for(kind)
            .iter()
            .chain(self.secondary_for(kind))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }
}
