//! Difficulty ranking: most constrained sessions are placed first.

use crate::data::{Session, SessionKind};

/// How hard a session is to place. Higher is harder.
pub fn difficulty(session: &Session) -> u32 {
    let breadth = match session.kind {
        SessionKind::Lecture => session.group_count * 10,
        SessionKind::Practical => 5,
    };
    let teacher = if session.teacher_id.is_some() { 20 } else { 0 };
    breadth + teacher + session.duration_minutes / 30
}

/// Sessions sorted by descending difficulty. Ties keep input order.
pub fn rank(sessions: &[Session]) -> Vec<&Session> {
    let mut ranked: Vec<&Session> = sessions.iter().collect();
    ranked.sort_by_key(|s| std::cmp::Reverse(difficulty(s)));
    ranked
}
