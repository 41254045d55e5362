//! Festival Lineup - a lineup browser backend with timetable layout
//!
//! This library provides the lineup store, the timetable layout engine that
//! positions performances on stage rows, and the artist media lookups behind
//! the HTTP API.

pub mod festival;
pub mod lineup;
pub mod media;
pub mod server;
pub mod timetable;
