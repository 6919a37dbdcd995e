//! Pattern playback on a dedicated timing thread
//!
//! `play` snapshots a pattern into a [`Timeline`] and moves it onto a worker
//! thread, which owns the pending queue outright. The command thread only ever
//! talks to the worker through its control channel, so cancelling never races
//! with an event being popped. The worker blocks on that channel until the next
//! deadline, which lets `stop` wake it immediately instead of waiting out a sleep.

use crate::midi::OutputSink;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use motif_core::{NoteAction, Pattern, ScheduledEvent, Timeline};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Already playing (use 'stop' first)")]
    AlreadyPlaying,

    #[error("No MIDI output available (use 'ports' to list available ports)")]
    NoOutput,

    #[error("Pattern '{0}' is empty")]
    EmptyPattern(String),

    #[error("Failed to start playback thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Returned by a successful `play`
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSummary {
    pub name: String,
    pub total_seconds: f64,
    pub tempo: u16,
}

impl fmt::Display for PlaybackSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "♪ Playing '{}' ({:.2}s, {} BPM)",
            self.name, self.total_seconds, self.tempo
        )
    }
}

/// Messages the command thread can send to the timing worker
#[derive(Debug)]
enum WorkerCommand {
    /// Drop every pending event and exit
    Stop,
}

/// Pitches that have been switched on and not yet off
pub type ActiveNotes = Arc<Mutex<BTreeSet<u8>>>;

struct Worker {
    command_tx: Sender<WorkerCommand>,
    handle: JoinHandle<()>,
    name: String,
}

/// Plays one pattern at a time into an [`OutputSink`]
pub struct Player {
    sink: Arc<dyn OutputSink>,
    active: ActiveNotes,
    is_playing: Arc<AtomicBool>,
    worker: Option<Worker>,
}

impl Player {
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self {
            sink,
            active: Arc::new(Mutex::new(BTreeSet::new())),
            is_playing: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn sink(&self) -> &Arc<dyn OutputSink> {
        &self.sink
    }

    /// True until the worker has fired its last event or been stopped
    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::Acquire)
    }

    /// Name of the pattern in flight, if any
    pub fn current(&self) -> Option<&str> {
        if self.is_playing() {
            self.worker.as_ref().map(|w| w.name.as_str())
        } else {
            None
        }
    }

    /// Pitches currently sounding
    pub fn active_notes(&self) -> Vec<u8> {
        self.active
            .lock()
            .map(|notes| notes.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Start playing `pattern` in the background and return straight away
    pub fn play(&mut self, pattern: &Pattern) -> Result<PlaybackSummary, PlaybackError> {
        if !self.sink.is_connected() {
            return Err(PlaybackError::NoOutput);
        }
        if self.is_playing() {
            return Err(PlaybackError::AlreadyPlaying);
        }
        if pattern.is_empty() {
            return Err(PlaybackError::EmptyPattern(pattern.name.clone()));
        }
        self.reap();

        let timeline = Timeline::from_pattern(pattern);
        let summary = PlaybackSummary {
            name: timeline.name.clone(),
            total_seconds: timeline.total_seconds,
            tempo: timeline.tempo,
        };

        let (command_tx, command_rx) = unbounded();
        let worker = TimingWorker {
            timeline,
            sink: self.sink.clone(),
            active: self.active.clone(),
            command_rx,
        };

        self.is_playing.store(true, Ordering::Release);
        let is_playing = self.is_playing.clone();
        let spawned = thread::Builder::new()
            .name("motif-playback".into())
            .spawn(move || {
                worker.run();
                is_playing.store(false, Ordering::Release);
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.is_playing.store(false, Ordering::Release);
                return Err(e.into());
            }
        };

        tracing::debug!(pattern = %summary.name, "playback started");
        self.worker = Some(Worker {
            command_tx,
            handle,
            name: summary.name.clone(),
        });
        Ok(summary)
    }

    /// Cancel anything pending and silence every note.
    ///
    /// Returns the number of pitches that were still sounding. Safe to call
    /// while idle; the all-notes-off flush is sent either way.
    pub fn stop(&mut self) -> usize {
        if let Some(worker) = self.worker.take() {
            // The worker may already have finished, in which case nobody is listening
            let _ = worker.command_tx.send(WorkerCommand::Stop);
            if worker.handle.join().is_err() {
                tracing::error!("playback thread panicked");
            }
            self.is_playing.store(false, Ordering::Release);
            tracing::debug!(pattern = %worker.name, "playback stopped");
        }
        self.flush()
    }

    /// Note-off for every tracked pitch, then All Notes Off on every channel
    fn flush(&self) -> usize {
        let pitches: Vec<u8> = match self.active.lock() {
            Ok(notes) => notes.iter().copied().collect(),
            Err(_) => Vec::new(),
        };

        let mut released = 0;
        for pitch in pitches {
            match self.sink.note_off(pitch) {
                Ok(()) => {
                    released += 1;
                    if let Ok(mut notes) = self.active.lock() {
                        notes.remove(&pitch);
                    }
                }
                Err(e) => tracing::warn!(pitch, "note off failed during stop: {:#}", e),
            }
        }

        if self.sink.is_connected() {
            if let Err(e) = self.sink.all_notes_off() {
                tracing::warn!("all notes off failed: {:#}", e);
            }
        }
        released
    }

    /// Join a worker that has already run to completion
    fn reap(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.handle.join().is_err() {
                tracing::error!("playback thread panicked");
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Owns the pending queue for one play
struct TimingWorker {
    timeline: Timeline,
    sink: Arc<dyn OutputSink>,
    active: ActiveNotes,
    command_rx: Receiver<WorkerCommand>,
}

impl TimingWorker {
    fn run(mut self) {
        let start = Instant::now();
        let total = self.timeline.len();

        while let Some(due) = self.timeline.peek().map(|event| event.deadline) {
            // Saturated or unrepresentable deadlines can never fire, and
            // neither can anything queued behind them
            let deadline = match start.checked_add(due) {
                Some(deadline) if due < Duration::MAX => deadline,
                _ => {
                    let unreachable = self.timeline.len();
                    self.timeline.clear();
                    tracing::debug!(unreachable, total, "dropped events beyond reach");
                    break;
                }
            };

            let wait = self.command_rx.recv_deadline(deadline);

            match wait {
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(event) = self.timeline.pop() {
                        self.fire(&event);
                    }
                }
                Ok(WorkerCommand::Stop) | Err(RecvTimeoutError::Disconnected) => {
                    let pending = self.timeline.len();
                    self.timeline.clear();
                    tracing::debug!(pending, total, "playback cancelled");
                    return;
                }
            }
        }

        tracing::debug!(total, "playback finished");
    }

    /// Deliver one event. Failures are logged and the worker moves on.
    fn fire(&self, event: &ScheduledEvent) {
        match event.action {
            NoteAction::On { pitch, velocity } => match self.sink.note_on(pitch, velocity) {
                Ok(()) => {
                    if let Ok(mut notes) = self.active.lock() {
                        notes.insert(pitch);
                    }
                }
                Err(e) => tracing::warn!(pitch, "note on failed: {:#}", e),
            },
            NoteAction::Off { pitch } => match self.sink.note_off(pitch) {
                Ok(()) => {
                    if let Ok(mut notes) = self.active.lock() {
                        notes.remove(&pitch);
                    }
                }
                // Left in the active set so the next stop retries it
                Err(e) => tracing::warn!(pitch, "note off failed: {:#}", e),
            },
        }
    }
}
