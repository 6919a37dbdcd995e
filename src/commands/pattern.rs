//! Pattern commands: building, defaults, transforms and the pattern table

use crate::commands::{no_args, single_arg, Command, CommandContext, CommandResult};
use colored::*;
use motif_core::state::{validate_length, validate_tempo, validate_velocity};
use motif_core::transform::OPERATIONS;
use motif_core::{MotifError, PatternBuilder, Transform};

pub const PAT_USAGE: &str = "pat <name> <beats> <note1> [note2 ...]";
pub const SEQ_USAGE: &str = "seq <note1> [note2 ...]";
pub const VEL_USAGE: &str = "vel [0-127]";
pub const LEN_USAGE: &str = "len [beats]";
pub const TEMPO_USAGE: &str = "tempo [20-300]";
pub const MOD_USAGE: &str = "mod <pattern> <op> [params]";
pub const LIST_USAGE: &str = "list";
pub const SHOW_USAGE: &str = "show <pattern>";
pub const DEL_USAGE: &str = "del <pattern>";
pub const CLEAR_USAGE: &str = "clear";

fn owned(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

pub fn parse_pattern(args: &[&str]) -> Result<Command, MotifError> {
    let [name, beats, notes @ ..] = args else {
        return Err(MotifError::usage(PAT_USAGE));
    };
    if notes.is_empty() {
        return Err(MotifError::usage(PAT_USAGE));
    }
    let beats = beats
        .parse::<i64>()
        .map_err(|_| MotifError::invalid_number("beats", beats))?;
    if beats <= 0 {
        return Err(MotifError::NotPositive("Beats"));
    }
    Ok(Command::Pattern {
        name: name.to_string(),
        beats,
        notes: owned(notes),
    })
}

pub fn parse_sequence(args: &[&str]) -> Result<Command, MotifError> {
    if args.is_empty() {
        return Err(MotifError::usage(SEQ_USAGE));
    }
    Ok(Command::Sequence(owned(args)))
}

pub fn parse_velocity(args: &[&str]) -> Result<Command, MotifError> {
    match args {
        [] => Ok(Command::Velocity(None)),
        [value] => {
            let value = value
                .parse::<i64>()
                .map_err(|_| MotifError::invalid_number("velocity", value))?;
            validate_velocity(value).map(|v| Command::Velocity(Some(v)))
        }
        _ => Err(MotifError::usage(VEL_USAGE)),
    }
}

pub fn parse_length(args: &[&str]) -> Result<Command, MotifError> {
    match args {
        [] => Ok(Command::Length(None)),
        [value] => {
            let value = value
                .parse::<f64>()
                .map_err(|_| MotifError::invalid_number("length", value))?;
            validate_length(value).map(|v| Command::Length(Some(v)))
        }
        _ => Err(MotifError::usage(LEN_USAGE)),
    }
}

pub fn parse_tempo(args: &[&str]) -> Result<Command, MotifError> {
    match args {
        [] => Ok(Command::Tempo(None)),
        [value] => {
            let value = value
                .parse::<i64>()
                .map_err(|_| MotifError::invalid_number("tempo", value))?;
            validate_tempo(value).map(|v| Command::Tempo(Some(v)))
        }
        _ => Err(MotifError::usage(TEMPO_USAGE)),
    }
}

pub fn parse_modify(args: &[&str]) -> Result<Command, MotifError> {
    let [name, op, params @ ..] = args else {
        return Err(MotifError::usage(format!(
            "{}\nOps: {}",
            MOD_USAGE,
            OPERATIONS.join(", ")
        )));
    };
    Ok(Command::Modify {
        name: name.to_string(),
        transform: Transform::parse(op, params)?,
    })
}

pub fn parse_list(args: &[&str]) -> Result<Command, MotifError> {
    no_args(args, LIST_USAGE, Command::List)
}

pub fn parse_show(args: &[&str]) -> Result<Command, MotifError> {
    single_arg(args, SHOW_USAGE).map(Command::Show)
}

pub fn parse_delete(args: &[&str]) -> Result<Command, MotifError> {
    single_arg(args, DEL_USAGE).map(Command::Delete)
}

pub fn parse_clear(args: &[&str]) -> Result<Command, MotifError> {
    no_args(args, CLEAR_USAGE, Command::Clear)
}

/// Handle `pat <name> <beats> <notes...>`
pub fn cmd_pattern(
    ctx: &mut CommandContext,
    name: &str,
    beats: i64,
    notes: &[String],
) -> CommandResult {
    let builder = PatternBuilder::new(ctx.session.defaults);
    match builder.full(name, beats, notes) {
        Ok(pattern) => {
            let count = pattern.len();
            ctx.session.register(pattern);
            CommandResult::Message(
                format!(
                    "Created pattern '{}' with {} notes over {} beats",
                    name, count, beats
                )
                .bright_green()
                .to_string(),
            )
        }
        Err(e) => e.into(),
    }
}

/// Handle `seq <notes...>`
pub fn cmd_sequence(ctx: &mut CommandContext, notes: &[String]) -> CommandResult {
    let builder = PatternBuilder::new(ctx.session.defaults);
    match builder.quick(notes) {
        Ok(pattern) => {
            let message = format!(
                "Sequence: {} notes → MIDI: {:?}",
                pattern.len(),
                pattern.pitches()
            );
            ctx.session.register(pattern);
            CommandResult::Message(message.bright_green().to_string())
        }
        Err(e) => e.into(),
    }
}

pub fn cmd_velocity(ctx: &mut CommandContext, value: Option<u8>) -> CommandResult {
    match value {
        Some(velocity) => {
            ctx.session.defaults.velocity = velocity;
            CommandResult::Message(format!("Velocity set to {}", velocity))
        }
        None => CommandResult::Message(format!(
            "Current velocity: {}",
            ctx.session.defaults.velocity
        )),
    }
}

pub fn cmd_length(ctx: &mut CommandContext, value: Option<f64>) -> CommandResult {
    match value {
        Some(length) => {
            ctx.session.defaults.length = length;
            CommandResult::Message(format!("Note length set to {} beats", length))
        }
        None => CommandResult::Message(format!(
            "Current note length: {} beats",
            ctx.session.defaults.length
        )),
    }
}

/// Affects patterns built afterwards; existing patterns keep their own tempo
pub fn cmd_tempo(ctx: &mut CommandContext, value: Option<u16>) -> CommandResult {
    match value {
        Some(tempo) => {
            ctx.session.defaults.tempo = tempo;
            CommandResult::Message(format!("🎵 Tempo set to {} BPM", tempo))
        }
        None => CommandResult::Message(format!(
            "Current tempo: {} BPM",
            ctx.session.defaults.tempo
        )),
    }
}

/// Handle `mod <pattern> <op> [params]`
pub fn cmd_modify(ctx: &mut CommandContext, name: &str, transform: Transform) -> CommandResult {
    match ctx.session.modify(name, transform) {
        Ok(message) => CommandResult::Message(message.bright_green().to_string()),
        Err(e) => e.into(),
    }
}

pub fn cmd_list(ctx: &mut CommandContext) -> CommandResult {
    if ctx.session.patterns.is_empty() {
        return CommandResult::Message("No patterns defined".to_string());
    }

    let mut output = vec!["Patterns:".bold().to_string()];
    for pattern in ctx.session.patterns.iter() {
        output.push(format!("  {}", pattern));
    }
    CommandResult::Message(output.join("\n"))
}

pub fn cmd_show(ctx: &mut CommandContext, name: &str) -> CommandResult {
    match ctx.session.patterns.get(name) {
        Ok(pattern) => CommandResult::Message(pattern.describe()),
        Err(e) => e.into(),
    }
}

pub fn cmd_delete(ctx: &mut CommandContext, name: &str) -> CommandResult {
    match ctx.session.patterns.remove(name) {
        Ok(_) => CommandResult::Message(format!("Deleted pattern '{}'", name)),
        Err(e) => e.into(),
    }
}

/// Playback already in flight keeps its own snapshot and is left running
pub fn cmd_clear(ctx: &mut CommandContext) -> CommandResult {
    ctx.session.reset();
    CommandResult::Message("Cleared all patterns and state".to_string())
}
