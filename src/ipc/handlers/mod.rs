pub mod core;
pub mod setup;
pub mod slots;
pub mod timetable;
