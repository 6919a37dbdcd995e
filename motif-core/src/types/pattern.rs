use crate::error::{MotifError, Result};
use crate::types::note::Note;
use std::fmt;

/// Slowest accepted tempo (BPM)
pub const MIN_TEMPO: u16 = 20;
/// Fastest accepted tempo (BPM)
pub const MAX_TEMPO: u16 = 300;

/// A named, tempo-tagged list of notes
///
/// Notes stay in insertion order; nothing here sorts them by time.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub name: String,
    pub notes: Vec<Note>,
    pub tempo: u16,
}

impl Pattern {
    pub fn new(name: impl Into<String>, notes: Vec<Note>, tempo: u16) -> Self {
        Pattern {
            name: name.into(),
            notes,
            tempo,
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Seconds per beat at this pattern's tempo
    pub fn beat_duration(&self) -> f64 {
        60.0 / self.tempo as f64
    }

    /// Latest note release, in beats. Zero for an empty pattern.
    pub fn length_in_beats(&self) -> f64 {
        self.notes
            .iter()
            .map(Note::end)
            .fold(None, |acc: Option<f64>, end| Some(acc.map_or(end, |a| a.max(end))))
            .unwrap_or(0.0)
    }

    /// Wall-clock length of one pass through the pattern, in seconds
    pub fn total_seconds(&self) -> f64 {
        self.length_in_beats() * self.beat_duration()
    }

    pub fn pitches(&self) -> Vec<u8> {
        self.notes.iter().map(|n| n.pitch).collect()
    }

    /// Multi-line dump used by `show`
    pub fn describe(&self) -> String {
        let mut lines = vec![
            format!("Pattern '{}':", self.name),
            format!("  Tempo: {} BPM", self.tempo),
            format!("  Notes ({}):", self.notes.len()),
        ];
        for (i, note) in self.notes.iter().enumerate() {
            lines.push(format!(
                "    {}. pitch={} vel={} dur={:.2} @{:.2}b",
                i + 1,
                note.pitch,
                note.velocity,
                note.duration,
                note.offset
            ));
        }
        lines.join("\n")
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} notes, {} BPM",
            self.name,
            self.notes.len(),
            self.tempo
        )
    }
}

/// Registered patterns, keyed by name, listed in the order they were first defined
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    patterns: Vec<Pattern>,
}

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern. A pattern with the same name is replaced in place
    /// and returned.
    pub fn insert(&mut self, pattern: Pattern) -> Option<Pattern> {
        match self.position(&pattern.name) {
            Some(index) => Some(std::mem::replace(&mut self.patterns[index], pattern)),
            None => {
                self.patterns.push(pattern);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Result<&Pattern> {
        self.patterns
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| MotifError::PatternNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Pattern> {
        self.patterns
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| MotifError::PatternNotFound(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Result<Pattern> {
        let index = self
            .position(name)
            .ok_or_else(|| MotifError::PatternNotFound(name.to_string()))?;
        Ok(self.patterns.remove(index))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.patterns.iter().position(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn melody() -> Pattern {
        Pattern::new(
            "melody",
            vec![
                Note::new(60, 80, 0.25, 0.0),
                Note::new(64, 80, 0.25, 1.0),
                Note::new(67, 80, 0.25, 2.0),
                Note::new(72, 80, 0.25, 3.0),
            ],
            120,
        )
    }

    #[test]
    fn test_total_seconds() {
        let pattern = melody();
        assert_eq!(pattern.beat_duration(), 0.5);
        assert_eq!(pattern.length_in_beats(), 3.25);
        assert!((pattern.total_seconds() - 1.625).abs() < 1e-12);
    }

    #[test]
    fn test_length_uses_latest_release_not_last_note() {
        let pattern = Pattern::new(
            "overlap",
            vec![Note::new(60, 80, 4.0, 0.0), Note::new(62, 80, 0.5, 1.0)],
            60,
        );
        assert_eq!(pattern.length_in_beats(), 4.0);
        assert_eq!(Pattern::new("empty", vec![], 60).length_in_beats(), 0.0);
    }

    #[test]
    fn test_describe() {
        let text = melody().describe();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Pattern 'melody':");
        assert_eq!(lines[1], "  Tempo: 120 BPM");
        assert_eq!(lines[2], "  Notes (4):");
        assert_eq!(lines[3], "    1. pitch=60 vel=80 dur=0.25 @0.00b");
        assert_eq!(lines[6], "    4. pitch=72 vel=80 dur=0.25 @3.00b");
    }

    #[test]
    fn test_table_replace_keeps_position() {
        let mut table = PatternTable::new();
        table.insert(melody());
        table.insert(Pattern::new("bass", vec![], 90));
        let old = table.insert(Pattern::new("melody", vec![], 100));

        assert_eq!(old.map(|p| p.len()), Some(4));
        assert_eq!(table.names(), vec!["melody", "bass"]);
        assert_eq!(table.get("melody").unwrap().tempo, 100);
    }

    #[test]
    fn test_table_lookup_errors() {
        let mut table = PatternTable::new();
        table.insert(melody());

        assert_eq!(
            table.get("nope").unwrap_err(),
            MotifError::PatternNotFound("nope".into())
        );
        assert!(table.remove("nope").is_err());
        assert_eq!(table.len(), 1);

        assert!(table.remove("melody").is_ok());
        assert!(table.is_empty());
    }
}
