//! Session state shared by every command: the pattern table and the defaults
//! new patterns are built with.

use crate::error::{MotifError, Result};
use crate::transform::Transform;
use crate::types::note::MIDI_MAX;
use crate::types::pattern::{Pattern, PatternTable, MAX_TEMPO, MIN_TEMPO};

pub const DEFAULT_VELOCITY: u8 = 80;
pub const DEFAULT_LENGTH: f64 = 0.25;
pub const DEFAULT_TEMPO: u16 = 120;

/// Values stamped onto newly built notes and patterns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Defaults {
    pub velocity: u8,
    /// Note length in beats
    pub length: f64,
    pub tempo: u16,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            velocity: DEFAULT_VELOCITY,
            length: DEFAULT_LENGTH,
            tempo: DEFAULT_TEMPO,
        }
    }
}

impl Defaults {
    /// Build a validated set of defaults
    pub fn new(velocity: i64, length: f64, tempo: i64) -> Result<Self> {
        Ok(Defaults {
            velocity: validate_velocity(velocity)?,
            length: validate_length(length)?,
            tempo: validate_tempo(tempo)?,
        })
    }
}

pub fn validate_velocity(value: i64) -> Result<u8> {
    if (0..=MIDI_MAX as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(MotifError::OutOfRange {
            what: "Velocity",
            min: 0,
            max: MIDI_MAX as i64,
        })
    }
}

pub fn validate_tempo(value: i64) -> Result<u16> {
    if (MIN_TEMPO as i64..=MAX_TEMPO as i64).contains(&value) {
        Ok(value as u16)
    } else {
        Err(MotifError::OutOfRange {
            what: "Tempo",
            min: MIN_TEMPO as i64,
            max: MAX_TEMPO as i64,
        })
    }
}

/// Lengths must be finite and strictly positive
pub fn validate_length(value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(MotifError::NotPositive("Length"))
    }
}

/// Everything the interpreter mutates between commands
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub patterns: PatternTable,
    pub defaults: Defaults,
    /// Restored by `reset`; set once at startup
    initial_defaults: Defaults,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: Defaults) -> Self {
        Session {
            patterns: PatternTable::new(),
            defaults,
            initial_defaults: defaults,
        }
    }

    /// Drop every pattern and restore the startup defaults
    pub fn reset(&mut self) {
        *self = Session::with_defaults(self.initial_defaults);
    }

    /// Register a pattern, replacing any pattern with the same name
    pub fn register(&mut self, pattern: Pattern) -> Option<Pattern> {
        self.patterns.insert(pattern)
    }

    /// Apply `transform` to the named pattern in place
    pub fn modify(&mut self, name: &str, transform: Transform) -> Result<String> {
        let pattern = self.patterns.get_mut(name)?;
        transform.apply(pattern);
        Ok(transform.describe(name))
    }
}
