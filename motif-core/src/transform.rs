//! In-place pattern transforms
//!
//! Transforms are parsed and validated up front, so a bad parameter never
//! leaves a pattern half-modified.

use crate::error::{MotifError, Result};
use crate::types::note::MIDI_MAX;
use crate::types::pattern::Pattern;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// Add semitones to every pitch, saturating at 0 and 127
    Transpose(i64),
    /// Reverse note order and mirror offsets around the latest start
    Reverse,
    /// Halve offsets and durations
    DoubleSpeed,
    /// Double offsets and durations
    HalfSpeed,
    /// Add beats to every offset; may go negative
    Shift(f64),
}

/// Operation names accepted by `mod`
pub const OPERATIONS: [&str; 5] = ["trans", "rev", "double", "half", "shift"];

impl Transform {
    /// Parse an operation name and its parameters
    pub fn parse<S: AsRef<str>>(op: &str, params: &[S]) -> Result<Self> {
        let first = params.first().map(|p| p.as_ref());

        match op.to_ascii_lowercase().as_str() {
            "trans" => {
                let value = first.ok_or_else(|| MotifError::usage("mod <pat> trans <semitones>"))?;
                value
                    .parse::<i64>()
                    .map(Transform::Transpose)
                    .map_err(|_| MotifError::invalid_number("semitones", value))
            }
            "rev" => Ok(Transform::Reverse),
            "double" => Ok(Transform::DoubleSpeed),
            "half" => Ok(Transform::HalfSpeed),
            "shift" => {
                let value = first.ok_or_else(|| MotifError::usage("mod <pat> shift <beats>"))?;
                match value.parse::<f64>() {
                    Ok(beats) if beats.is_finite() => Ok(Transform::Shift(beats)),
                    _ => Err(MotifError::invalid_number("shift", value)),
                }
            }
            _ => Err(MotifError::UnknownOperation(op.to_string())),
        }
    }

    pub fn apply(&self, pattern: &mut Pattern) {
        match *self {
            Transform::Transpose(semitones) => {
                for note in &mut pattern.notes {
                    let pitch = (note.pitch as i64).saturating_add(semitones);
                    note.pitch = pitch.clamp(0, MIDI_MAX as i64) as u8;
                }
            }
            Transform::Reverse => reverse(pattern),
            Transform::DoubleSpeed => scale_time(pattern, 0.5),
            Transform::HalfSpeed => scale_time(pattern, 2.0),
            Transform::Shift(beats) => {
                for note in &mut pattern.notes {
                    note.offset += beats;
                }
            }
        }
    }

    /// Confirmation line for the pattern called `name`
    pub fn describe(&self, name: &str) -> String {
        match self {
            Transform::Transpose(semitones) => {
                format!("Transposed '{}' by {} semitones", name, semitones)
            }
            Transform::Reverse => format!("Reversed '{}'", name),
            Transform::DoubleSpeed => format!("Doubled speed of '{}'", name),
            Transform::HalfSpeed => format!("Halved speed of '{}'", name),
            Transform::Shift(beats) => format!("Shifted '{}' by {} beats", name, beats),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Transpose(semitones) => write!(f, "trans {}", semitones),
            Transform::Reverse => write!(f, "rev"),
            Transform::DoubleSpeed => write!(f, "double"),
            Transform::HalfSpeed => write!(f, "half"),
            Transform::Shift(beats) => write!(f, "shift {}", beats),
        }
    }
}

/// Durations are kept as they are, so a long note that ended the pattern
/// now starts near the beginning and can overhang the old end.
fn reverse(pattern: &mut Pattern) {
    let Some(max_offset) = pattern.notes.iter().map(|n| n.offset).reduce(f64::max) else {
        return;
    };
    pattern.notes.reverse();
    for note in &mut pattern.notes {
        note.offset = max_offset - note.offset;
    }
}

fn scale_time(pattern: &mut Pattern, factor: f64) {
    for note in &mut pattern.notes {
        note.offset *= factor;
        note.duration *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::note::Note;

    fn pattern(notes: &[(u8, f64, f64)]) -> Pattern {
        Pattern::new(
            "p",
            notes
                .iter()
                .map(|&(pitch, duration, offset)| Note::new(pitch, 80, duration, offset))
                .collect(),
            120,
        )
    }

    fn offsets(pattern: &Pattern) -> Vec<f64> {
        pattern.notes.iter().map(|n| n.offset).collect()
    }

    fn durations(pattern: &Pattern) -> Vec<f64> {
        pattern.notes.iter().map(|n| n.duration).collect()
    }

    #[test]
    fn test_transpose_saturates() {
        let mut p = pattern(&[(0, 1.0, 0.0), (60, 1.0, 1.0), (127, 1.0, 2.0)]);

        Transform::Transpose(12).apply(&mut p);
        assert_eq!(p.pitches(), vec![12, 72, 127]);

        Transform::Transpose(-12).apply(&mut p);
        // 127 was clamped on the way up, so it doesn't come back
        assert_eq!(p.pitches(), vec![0, 60, 115]);
    }

    #[test]
    fn test_transpose_extremes_stay_in_range() {
        for semitones in [i64::MIN, -1000, -128, -1, 0, 1, 127, 128, 1000, i64::MAX] {
            let mut p = pattern(&[(0, 1.0, 0.0), (64, 1.0, 0.0), (127, 1.0, 0.0)]);
            Transform::Transpose(semitones).apply(&mut p);
            assert!(p.notes.iter().all(|n| n.pitch <= 127), "{}", semitones);
        }

        let mut p = pattern(&[(64, 1.0, 0.0)]);
        Transform::Transpose(i64::MIN).apply(&mut p);
        assert_eq!(p.pitches(), vec![0]);
        Transform::Transpose(i64::MAX).apply(&mut p);
        assert_eq!(p.pitches(), vec![127]);
    }

    #[test]
    fn test_reverse_mirrors_offsets_keeps_durations() {
        let mut p = pattern(&[(60, 0.5, 0.0), (62, 0.5, 1.0), (64, 2.0, 3.0)]);
        Transform::Reverse.apply(&mut p);

        assert_eq!(p.pitches(), vec![64, 62, 60]);
        assert_eq!(offsets(&p), vec![0.0, 2.0, 3.0]);
        assert_eq!(durations(&p), vec![2.0, 0.5, 0.5]);
    }

    #[test]
    fn test_reverse_keeps_durations_so_notes_can_overhang() {
        let mut p = pattern(&[(60, 4.0, 0.0), (62, 0.5, 1.0)]);
        assert_eq!(p.length_in_beats(), 4.0);

        Transform::Reverse.apply(&mut p);
        assert_eq!(p.pitches(), vec![62, 60]);
        assert_eq!(offsets(&p), vec![0.0, 1.0]);
        // The long opening note now starts at beat 1 and runs past the old end
        assert_eq!(p.length_in_beats(), 5.0);
    }

    #[test]
    fn test_reverse_twice_drops_leading_rest() {
        let original = pattern(&[(60, 1.0, 1.0), (62, 3.0, 2.0), (64, 0.5, 3.5)]);
        assert_eq!(original.length_in_beats(), 5.0);

        let mut p = original.clone();
        Transform::Reverse.apply(&mut p);
        assert_eq!(p.pitches(), vec![64, 62, 60]);
        assert_eq!(offsets(&p), vec![0.0, 1.5, 2.5]);
        assert_eq!(durations(&p), vec![0.5, 3.0, 1.0]);
        assert_eq!(p.length_in_beats(), 4.5);

        // Offsets are mirrored around the latest start, so the second pass
        // doesn't bring back the one-beat rest the pattern began with
        Transform::Reverse.apply(&mut p);
        assert_eq!(p.pitches(), vec![60, 62, 64]);
        assert_eq!(offsets(&p), vec![0.0, 1.0, 2.5]);
        assert_eq!(durations(&p), vec![1.0, 3.0, 0.5]);
        assert_ne!(p, original);
    }

    #[test]
    fn test_reverse_after_negative_shift() {
        let mut p = pattern(&[(60, 1.0, 0.0), (62, 1.0, 2.0)]);
        Transform::Shift(-1.0).apply(&mut p);
        Transform::Reverse.apply(&mut p);
        assert_eq!(offsets(&p), vec![0.0, 2.0]);
        assert_eq!(p.pitches(), vec![62, 60]);
    }

    #[test]
    fn test_reverse_empty_is_noop() {
        let mut p = pattern(&[]);
        Transform::Reverse.apply(&mut p);
        assert!(p.is_empty());
    }

    #[test]
    fn test_double_half_round_trip() {
        let original = pattern(&[(60, 0.25, 0.0), (62, 0.3, 1.1), (64, 1.7, 2.9)]);

        let mut p = original.clone();
        Transform::DoubleSpeed.apply(&mut p);
        assert_eq!(offsets(&p), vec![0.0, 0.55, 1.45]);
        Transform::HalfSpeed.apply(&mut p);
        for (a, b) in p.notes.iter().zip(&original.notes) {
            assert!((a.offset - b.offset).abs() < 1e-12);
            assert!((a.duration - b.duration).abs() < 1e-12);
        }

        let mut p = original.clone();
        Transform::HalfSpeed.apply(&mut p);
        assert_eq!(durations(&p), vec![0.5, 0.6, 3.4]);
        Transform::DoubleSpeed.apply(&mut p);
        for (a, b) in p.notes.iter().zip(&original.notes) {
            assert!((a.offset - b.offset).abs() < 1e-12);
            assert!((a.duration - b.duration).abs() < 1e-12);
        }
    }

    #[test]
    fn test_shift_can_go_negative() {
        let mut p = pattern(&[(60, 1.0, 0.0), (62, 1.0, 1.0)]);
        Transform::Shift(-0.5).apply(&mut p);
        assert_eq!(offsets(&p), vec![-0.5, 0.5]);
    }

    #[test]
    fn test_parse_operations() {
        let none: [&str; 0] = [];
        assert_eq!(Transform::parse("trans", &["12"]), Ok(Transform::Transpose(12)));
        assert_eq!(Transform::parse("TRANS", &["-7"]), Ok(Transform::Transpose(-7)));
        assert_eq!(Transform::parse("rev", &none), Ok(Transform::Reverse));
        assert_eq!(Transform::parse("double", &none), Ok(Transform::DoubleSpeed));
        assert_eq!(Transform::parse("half", &none), Ok(Transform::HalfSpeed));
        assert_eq!(Transform::parse("shift", &["-0.5"]), Ok(Transform::Shift(-0.5)));
    }

    #[test]
    fn test_parse_rejects_bad_parameters() {
        let none: [&str; 0] = [];
        assert_eq!(
            Transform::parse("trans", &["1.5"]),
            Err(MotifError::invalid_number("semitones", "1.5"))
        );
        assert!(matches!(
            Transform::parse("trans", &none),
            Err(MotifError::Usage(_))
        ));
        assert_eq!(
            Transform::parse("shift", &["later"]),
            Err(MotifError::invalid_number("shift", "later"))
        );
        assert!(Transform::parse("shift", &["inf"]).is_err());
        assert!(Transform::parse("shift", &["NaN"]).is_err());
        assert_eq!(
            Transform::parse("invert", &none),
            Err(MotifError::UnknownOperation("invert".into()))
        );
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            Transform::Transpose(12).describe("melody"),
            "Transposed 'melody' by 12 semitones"
        );
        assert_eq!(
            Transform::Shift(0.5).describe("melody"),
            "Shifted 'melody' by 0.5 beats"
        );
        assert_eq!(Transform::Reverse.to_string(), "rev");
    }
}
