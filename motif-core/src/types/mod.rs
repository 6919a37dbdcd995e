// motif-core/src/types/mod.rs

pub mod note;
pub mod pattern;
pub mod scheduled_event;

pub use note::{parse_pitch, Note};
pub use pattern::{Pattern, PatternTable};
pub use scheduled_event::{NoteAction, ScheduledEvent, Timeline, LATENCY_COMPENSATION};
