//! Playback commands

use crate::commands::{no_args, single_arg, Command, CommandContext, CommandResult};
use colored::*;
use motif_core::MotifError;

pub const PLAY_USAGE: &str = "play <pattern>";
pub const STOP_USAGE: &str = "stop";

pub fn parse_play(args: &[&str]) -> Result<Command, MotifError> {
    single_arg(args, PLAY_USAGE).map(Command::Play)
}

pub fn parse_stop(args: &[&str]) -> Result<Command, MotifError> {
    no_args(args, STOP_USAGE, Command::Stop)
}

/// Handle `play <pattern>`. Returns as soon as the worker is started.
pub fn cmd_play(ctx: &mut CommandContext, name: &str) -> CommandResult {
    let pattern = match ctx.session.patterns.get(name) {
        Ok(pattern) => pattern,
        Err(e) => return e.into(),
    };

    match ctx.player.play(pattern) {
        Ok(summary) => CommandResult::Message(summary.to_string().bright_cyan().to_string()),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

/// Handle `stop`. Always sends the all-notes-off sweep, even when idle.
pub fn cmd_stop(ctx: &mut CommandContext) -> CommandResult {
    let released = ctx.player.stop();
    tracing::debug!(released, "Playback stopped from command");
    CommandResult::Message("■ Playback stopped".to_string())
}
