//! Weekly timetable generation.
//!
//! Given teaching sessions, rooms and a calendar grid, [`generation::generate`]
//! assigns each session a (day, slot, room) so that no room, group or teacher
//! is booked twice in the same cell, and reports the sessions it could not place.

pub mod config;
pub mod data;
pub mod error;
pub mod generation;
pub mod server;
