//! Turns note tokens into patterns.
//!
//! There are two spacing policies and they are deliberately different:
//! the full form spreads the notes evenly across a requested number of beats,
//! the quick form steps by the current default note length.

use crate::error::{MotifError, Result};
use crate::state::Defaults;
use crate::types::note::{parse_pitch, Note};
use crate::types::pattern::Pattern;

/// Name under which quick sequences are stored
pub const SEQUENCE_NAME: &str = "_seq";

pub struct PatternBuilder {
    defaults: Defaults,
}

impl PatternBuilder {
    pub fn new(defaults: Defaults) -> Self {
        Self { defaults }
    }

    /// `offset[i] = i * (beats / tokens.len())`
    pub fn full<S: AsRef<str>>(&self, name: &str, beats: i64, tokens: &[S]) -> Result<Pattern> {
        if beats <= 0 {
            return Err(MotifError::NotPositive("Beats"));
        }
        let step = beats as f64 / tokens.len().max(1) as f64;
        self.build(name, tokens, step)
    }

    /// `offset[i] = i * default_length`, stored as [`SEQUENCE_NAME`]
    pub fn quick<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Pattern> {
        self.build(SEQUENCE_NAME, tokens, self.defaults.length)
    }

    fn build<S: AsRef<str>>(&self, name: &str, tokens: &[S], step: f64) -> Result<Pattern> {
        if tokens.is_empty() {
            return Err(MotifError::usage("no notes specified"));
        }

        // Resolve every token before creating anything
        let pitches = tokens
            .iter()
            .map(|t| parse_pitch(t.as_ref()))
            .collect::<Result<Vec<u8>>>()?;

        let notes = pitches
            .into_iter()
            .enumerate()
            .map(|(i, pitch)| {
                Note::new(
                    pitch,
                    self.defaults.velocity,
                    self.defaults.length,
                    i as f64 * step,
                )
            })
            .collect();

        Ok(Pattern::new(name, notes, self.defaults.tempo))
    }
}
