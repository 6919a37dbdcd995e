//! # Motif Core
//!
//! Pattern model for the motif live MIDI pattern language, free of any MIDI or
//! terminal dependencies.
//!
//! - `types`: notes, patterns and the absolute-time [`Timeline`] a pattern is
//!   turned into for playback
//! - `builder`: note tokens to patterns
//! - `transform`: in-place pattern mutations (`trans`, `rev`, `double`, `half`, `shift`)
//! - `state`: the session (pattern table plus defaults) every command works on
//!
//! ## Example
//!
//! ```
//! use motif_core::{PatternBuilder, Session, Transform};
//!
//! let mut session = Session::new();
//! let pattern = PatternBuilder::new(session.defaults)
//!     .full("melody", 4, &["c4", "e4", "g4", "c5"])
//!     .unwrap();
//! session.register(pattern);
//! session.modify("melody", Transform::Transpose(12)).unwrap();
//!
//! assert_eq!(session.patterns.get("melody").unwrap().pitches(), vec![72, 76, 79, 84]);
//! ```

pub mod builder;
pub mod error;
pub mod state;
pub mod transform;
pub mod types;

pub use builder::{PatternBuilder, SEQUENCE_NAME};
pub use error::{ErrorCategory, MotifError};
pub use state::{Defaults, Session};
pub use transform::Transform;
pub use types::{Note, NoteAction, Pattern, PatternTable, ScheduledEvent, Timeline};
