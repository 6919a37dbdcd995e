//! Absolute-time events for pattern playback
//!
//! A [`Timeline`] is a snapshot of a pattern converted from beats into
//! wall-clock deadlines measured from the moment playback starts. Every event
//! carries its pitch and velocity by value, so changing the pattern afterwards
//! does not touch a schedule that is already running.

use crate::types::pattern::Pattern;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

/// Lead time added to every note-on to absorb output-path jitter
pub const LATENCY_COMPENSATION: Duration = Duration::from_millis(2);

/// A note-off this close to a later note-on of the same pitch is moved onto it
pub const COINCIDENCE_TOLERANCE: Duration = Duration::from_micros(1);

/// What to send when an event's deadline is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteAction {
    On { pitch: u8, velocity: u8 },
    Off { pitch: u8 },
}

impl NoteAction {
    pub fn pitch(&self) -> u8 {
        match self {
            NoteAction::On { pitch, .. } | NoteAction::Off { pitch } => *pitch,
        }
    }

    /// Offs sort ahead of ons due at the same instant
    fn rank(&self) -> u8 {
        match self {
            NoteAction::Off { .. } => 0,
            NoteAction::On { .. } => 1,
        }
    }
}

/// An action due at `deadline` after playback start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub deadline: Duration,
    /// Insertion order, the last tie-break between equal deadlines
    pub sequence: usize,
    pub action: NoteAction,
}

impl ScheduledEvent {
    pub fn new(deadline: Duration, sequence: usize, action: NoteAction) -> Self {
        Self {
            deadline,
            sequence,
            action,
        }
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the earliest deadline first
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.action.rank().cmp(&self.action.rank()))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Min-heap of scheduled events plus summary data for one play of a pattern
#[derive(Debug, Clone)]
pub struct Timeline {
    pub name: String,
    pub tempo: u16,
    /// `max(offset + duration) * beat_duration`, in seconds
    pub total_seconds: f64,
    events: BinaryHeap<ScheduledEvent>,
}

impl Timeline {
    /// Snapshot `pattern` into deadlines.
    ///
    /// Note-on fires at `max(0, offset) * beat + LATENCY_COMPENSATION` and the
    /// matching note-off at `(max(0, offset) + duration) * beat` plus the same
    /// lead. Negative offsets therefore fire immediately rather than before
    /// playback starts.
    ///
    /// A note's off always lands strictly after its own on. When it lands on
    /// (or within [`COINCIDENCE_TOLERANCE`] of) a later on of the same pitch,
    /// it is snapped to that on and fires first, so back-to-back repeats of
    /// one pitch never cut each other off.
    pub fn from_pattern(pattern: &Pattern) -> Self {
        let beat = pattern.beat_duration();
        let at_beat = |beats: f64| seconds(beats * beat).saturating_add(LATENCY_COMPENSATION);

        let slots: Vec<(u8, u8, Duration, Duration)> = pattern
            .notes
            .iter()
            .map(|note| {
                let start = note.offset.max(0.0);
                let on_at = at_beat(start);
                let mut off_at = at_beat(start + note.duration);
                if off_at <= on_at && on_at < Duration::MAX {
                    off_at = on_at + Duration::from_nanos(1);
                }
                (note.pitch, note.velocity, on_at, off_at)
            })
            .collect();

        let mut events = BinaryHeap::with_capacity(slots.len() * 2);
        for (i, &(pitch, velocity, on_at, off_at)) in slots.iter().enumerate() {
            let off_at = slots
                .iter()
                .filter(|&&(other, _, next_on, _)| other == pitch && next_on > on_at)
                .map(|&(_, _, next_on, _)| next_on)
                .find(|&next_on| within(next_on, off_at, COINCIDENCE_TOLERANCE))
                .unwrap_or(off_at);

            events.push(ScheduledEvent::new(
                on_at,
                i * 2,
                NoteAction::On { pitch, velocity },
            ));
            events.push(ScheduledEvent::new(
                off_at,
                i * 2 + 1,
                NoteAction::Off { pitch },
            ));
        }

        Timeline {
            name: pattern.name.clone(),
            tempo: pattern.tempo,
            total_seconds: pattern.total_seconds(),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The next event due, without removing it
    pub fn peek(&self) -> Option<&ScheduledEvent> {
        self.events.peek()
    }

    /// Remove and return the next event due
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.events.pop()
    }

    /// Drop every pending event
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Drain into a vector in firing order
    pub fn into_sorted_events(self) -> Vec<ScheduledEvent> {
        // into_sorted_vec is ascending by Ord, which is reversed here
        let mut events = self.events.into_sorted_vec();
        events.reverse();
        events
    }
}

fn within(a: Duration, b: Duration, tolerance: Duration) -> bool {
    let diff = if a > b { a - b } else { b - a };
    diff <= tolerance
}

/// Seconds to `Duration`, saturating on overflow and treating NaN/negatives as zero
fn seconds(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PatternBuilder;
    use crate::state::Defaults;
    use crate::types::note::Note;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn approx(a: Duration, b: Duration) -> bool {
        within(a, b, Duration::from_micros(1))
    }

    #[test]
    fn test_scheduled_event_ordering() {
        let mut heap = BinaryHeap::new();

        heap.push(ScheduledEvent::new(ms(20), 0, NoteAction::Off { pitch: 60 }));
        heap.push(ScheduledEvent::new(
            ms(0),
            1,
            NoteAction::On {
                pitch: 62,
                velocity: 90,
            },
        ));
        heap.push(ScheduledEvent::new(ms(10), 2, NoteAction::Off { pitch: 62 }));

        assert_eq!(heap.pop().unwrap().deadline, ms(0));
        assert_eq!(heap.pop().unwrap().deadline, ms(10));
        assert_eq!(heap.pop().unwrap().deadline, ms(20));
    }

    #[test]
    fn test_legato_repeat_releases_before_retrigger() {
        // Legato repeat of one pitch: the first note's off must precede the second's on
        let pattern = Pattern::new(
            "legato",
            vec![Note::new(60, 80, 1.0, 0.0), Note::new(60, 80, 1.0, 1.0)],
            60,
        );
        let actions: Vec<NoteAction> = Timeline::from_pattern(&pattern)
            .into_sorted_events()
            .into_iter()
            .map(|e| e.action)
            .collect();

        assert_eq!(
            actions,
            vec![
                NoteAction::On {
                    pitch: 60,
                    velocity: 80
                },
                NoteAction::Off { pitch: 60 },
                NoteAction::On {
                    pitch: 60,
                    velocity: 80
                },
                NoteAction::Off { pitch: 60 },
            ]
        );
    }

    #[test]
    fn test_repeated_pitch_never_cuts_itself_off() {
        let tokens = ["60"; 16];
        let lengths = [0.1, 0.125, 0.2, 0.25, 0.3, 1.0 / 3.0, 0.7];
        let tempos = [60, 89, 90, 97, 120, 133, 175, 233, 300];

        for length in lengths {
            for tempo in tempos {
                let defaults = Defaults {
                    velocity: 80,
                    length,
                    tempo,
                };
                let pattern = PatternBuilder::new(defaults).quick(&tokens).unwrap();
                let events = Timeline::from_pattern(&pattern).into_sorted_events();

                // One pitch played legato must strictly alternate on, off, on, off
                for (i, event) in events.iter().enumerate() {
                    let expect_on = i % 2 == 0;
                    assert_eq!(
                        matches!(event.action, NoteAction::On { .. }),
                        expect_on,
                        "length {} tempo {} event {} at {:?}",
                        length,
                        tempo,
                        i,
                        event.deadline
                    );
                }
                for pair in events[1..].chunks(2).filter(|pair| pair.len() == 2) {
                    assert_eq!(pair[0].deadline, pair[1].deadline);
                }
            }
        }
    }

    #[test]
    fn test_off_ranks_before_on_at_same_deadline() {
        // Inserted out of time order: the later note is listed first
        let pattern = Pattern::new(
            "unsorted",
            vec![Note::new(60, 80, 1.0, 1.0), Note::new(60, 80, 1.0, 0.0)],
            60,
        );
        let actions: Vec<NoteAction> = Timeline::from_pattern(&pattern)
            .into_sorted_events()
            .into_iter()
            .map(|e| e.action)
            .collect();

        assert_eq!(
            actions,
            vec![
                NoteAction::On {
                    pitch: 60,
                    velocity: 80
                },
                NoteAction::Off { pitch: 60 },
                NoteAction::On {
                    pitch: 60,
                    velocity: 80
                },
                NoteAction::Off { pitch: 60 },
            ]
        );
    }

    #[test]
    fn test_vanishing_duration_still_follows_its_on() {
        let pattern = Pattern::new("blip", vec![Note::new(60, 80, 1e-12, 0.0)], 120);
        let events = Timeline::from_pattern(&pattern).into_sorted_events();

        assert_eq!(events[0].action, NoteAction::On { pitch: 60, velocity: 80 });
        assert_eq!(events[1].action, NoteAction::Off { pitch: 60 });
        assert!(events[1].deadline > events[0].deadline);
    }

    #[test]
    fn test_deadlines_include_latency() {
        let pattern = Pattern::new(
            "melody",
            vec![Note::new(60, 80, 0.25, 0.0), Note::new(64, 80, 0.25, 1.0)],
            120,
        );
        let events = Timeline::from_pattern(&pattern).into_sorted_events();

        assert_eq!(events.len(), 4);
        assert!(approx(events[0].deadline, ms(2)));
        assert!(approx(events[1].deadline, ms(127)));
        assert!(approx(events[2].deadline, ms(502)));
        assert!(approx(events[3].deadline, ms(627)));
    }

    #[test]
    fn test_negative_offset_fires_at_start() {
        let pattern = Pattern::new(
            "shifted",
            vec![Note::new(60, 80, 1.0, -2.0), Note::new(62, 80, 1.0, 0.5)],
            60,
        );
        let events = Timeline::from_pattern(&pattern).into_sorted_events();

        assert_eq!(events[0].action.pitch(), 60);
        assert_eq!(events[0].deadline, LATENCY_COMPENSATION);
        assert!(approx(events[1].deadline, ms(502)));
        assert_eq!(events[1].action, NoteAction::On { pitch: 62, velocity: 80 });
        // Off is measured from the clamped on-deadline
        assert!(approx(events[2].deadline, ms(1002)));
        assert_eq!(events[2].action, NoteAction::Off { pitch: 60 });
    }

    #[test]
    fn test_every_on_precedes_its_off() {
        let pattern = Pattern::new(
            "chord",
            vec![
                Note::new(67, 80, 0.5, 0.0),
                Note::new(64, 80, 2.0, 0.0),
                Note::new(60, 80, 1.0, 0.0),
            ],
            200,
        );
        let events = Timeline::from_pattern(&pattern).into_sorted_events();

        for pitch in [60u8, 64, 67] {
            let on = events
                .iter()
                .position(|e| matches!(e.action, NoteAction::On { pitch: p, .. } if p == pitch))
                .unwrap();
            let off = events
                .iter()
                .position(|e| e.action == NoteAction::Off { pitch })
                .unwrap();
            assert!(on < off, "pitch {}", pitch);
        }
        assert!(events.windows(2).all(|w| w[0].deadline <= w[1].deadline));
    }

    #[test]
    fn test_summary_fields() {
        let pattern = Pattern::new("p", vec![Note::new(60, 80, 0.5, 1.5)], 60);
        let timeline = Timeline::from_pattern(&pattern);
        assert_eq!(timeline.name, "p");
        assert_eq!(timeline.tempo, 60);
        assert_eq!(timeline.total_seconds, 2.0);
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn test_huge_offsets_saturate() {
        let pattern = Pattern::new("far", vec![Note::new(60, 80, 1.0, 1e300)], 120);
        let events = Timeline::from_pattern(&pattern).into_sorted_events();
        assert_eq!(events[0].deadline, Duration::MAX);
        assert_eq!(events[1].deadline, Duration::MAX);
    }
}
