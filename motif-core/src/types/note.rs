use crate::error::{MotifError, Result};

/// Highest MIDI pitch or velocity value
pub const MIDI_MAX: u8 = 127;

/// Note names understood without an accidental.
/// Bare letters map to a pitch class; `c4`..`b5` map straight to MIDI numbers.
const NOTE_TABLE: [(&str, u8); 21] = [
    ("c", 0),
    ("d", 2),
    ("e", 4),
    ("f", 5),
    ("g", 7),
    ("a", 9),
    ("b", 11),
    ("c4", 60),
    ("d4", 62),
    ("e4", 64),
    ("f4", 65),
    ("g4", 67),
    ("a4", 69),
    ("b4", 71),
    ("c5", 72),
    ("d5", 74),
    ("e5", 76),
    ("f5", 77),
    ("g5", 79),
    ("a5", 81),
    ("b5", 83),
];

/// A single note inside a pattern
///
/// `offset` and `duration` are measured in beats. `offset` is relative to the
/// start of the owning pattern and may be negative after a shift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub pitch: u8,
    pub velocity: u8,
    pub duration: f64,
    pub offset: f64,
}

impl Note {
    pub fn new(pitch: u8, velocity: u8, duration: f64, offset: f64) -> Self {
        Note {
            pitch: pitch.min(MIDI_MAX),
            velocity: velocity.min(MIDI_MAX),
            duration,
            offset,
        }
    }

    /// Beat at which this note is released
    pub fn end(&self) -> f64 {
        self.offset + self.duration
    }
}

/// Resolve a note token to a MIDI pitch.
///
/// Tried in order:
/// 1. a plain MIDI number (`60`)
/// 2. a table name, either a bare letter (`c`) or letter + octave 4/5 (`c4`)
/// 3. letter, optional `#`/`b`, single octave digit (`c#4`, `eb3`)
///
/// Octaves follow scientific pitch notation, so `c4` is 60 in every tier.
pub fn parse_pitch(token: &str) -> Result<u8> {
    let invalid = || MotifError::InvalidNote(token.to_string());

    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        return match token.parse::<u32>() {
            Ok(pitch) if pitch <= MIDI_MAX as u32 => Ok(pitch as u8),
            _ => Err(invalid()),
        };
    }

    let lower = token.to_ascii_lowercase();
    if let Some(&(_, pitch)) = NOTE_TABLE.iter().find(|(name, _)| *name == lower) {
        return Ok(pitch);
    }

    let pitch = parse_spelled(&lower).ok_or_else(invalid)?;
    if (0..=MIDI_MAX as i32).contains(&pitch) {
        Ok(pitch as u8)
    } else {
        Err(invalid())
    }
}

/// `[a-g][#b]?[0-9]` matched against the whole token
fn parse_spelled(token: &str) -> Option<i32> {
    let bytes = token.as_bytes();
    let (&letter, rest) = bytes.split_first()?;
    let class = letter_class(letter)?;

    let (accidental, rest) = match rest.split_first() {
        Some((b'#', tail)) => (1, tail),
        Some((b'b', tail)) => (-1, tail),
        _ => (0, rest),
    };

    match rest {
        [digit] if digit.is_ascii_digit() => {
            let octave = (digit - b'0') as i32;
            // Octave -1 starts at 0 so spelled names agree with the table (c4 = 60);
            // a bare `12 * octave` would put c#4 an octave below c4
            Some(class + accidental + 12 * (octave + 1))
        }
        _ => None,
    }
}

fn letter_class(letter: u8) -> Option<i32> {
    match letter {
        b'c' => Some(0),
        b'd' => Some(2),
        b'e' => Some(4),
        b'f' => Some(5),
        b'g' => Some(7),
        b'a' => Some(9),
        b'b' => Some(11),
        _ => None,
    }
}
