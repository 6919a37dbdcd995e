//! General REPL commands (help, status, exit)

use crate::commands::{no_args, Command, CommandContext, CommandRegistry, CommandResult, Section};
use colored::*;
use motif_core::transform::OPERATIONS;
use motif_core::MotifError;

pub const HELP_USAGE: &str = "help [command]";
pub const STATUS_USAGE: &str = "status";
pub const EXIT_USAGE: &str = "exit";

pub fn parse_help(args: &[&str]) -> Result<Command, MotifError> {
    match args {
        [] => Ok(Command::Help(None)),
        [topic] => Ok(Command::Help(Some(topic.to_lowercase()))),
        _ => Err(MotifError::usage(HELP_USAGE)),
    }
}

pub fn parse_status(args: &[&str]) -> Result<Command, MotifError> {
    no_args(args, STATUS_USAGE, Command::Status)
}

pub fn parse_exit(args: &[&str]) -> Result<Command, MotifError> {
    no_args(args, EXIT_USAGE, Command::Exit)
}

/// Handle `help [command]`
pub fn cmd_help(registry: &CommandRegistry, topic: Option<&str>) -> CommandResult {
    match topic {
        Some(topic) => match registry.find(topic) {
            Some(spec) => {
                let mut output = format!("{}\n  {}", spec.usage.cyan(), spec.summary);
                if spec.name == "mod" {
                    output.push_str(&format!("\n  Ops: {}", OPERATIONS.join(", ")));
                }
                CommandResult::Message(output)
            }
            None => MotifError::UnknownCommand(topic.to_string()).into(),
        },
        None => CommandResult::Message(help_text(registry)),
    }
}

fn help_text(registry: &CommandRegistry) -> String {
    let mut lines = vec![
        "🎹 Motif Commands".bold().to_string(),
        "================".bold().to_string(),
    ];

    for section in Section::ALL {
        lines.push(String::new());
        lines.push(section.title().green().to_string());
        for spec in registry.specs().filter(|spec| spec.section == section) {
            lines.push(format!("  {:<40} {}", spec.usage.cyan(), spec.summary));
        }
    }

    lines.push(String::new());
    lines.push("Notes:".green().to_string());
    lines.push("  MIDI numbers (60), note names (c4, e4, c5) or spelled pitches (c#4, eb3)".into());
    lines.push(String::new());
    lines.push("Example:".green().to_string());
    lines.push(format!("  motif> {}", "pat melody 4 c4 e4 g4 c5".cyan()));
    lines.push(format!("  motif> {}", "mod melody trans 12".cyan()));
    lines.push(format!("  motif> {}", "play melody".cyan()));
    lines.join("\n")
}

/// Handle `status` - playback state, port and defaults in one view
pub fn cmd_status(ctx: &mut CommandContext) -> CommandResult {
    let port = ctx
        .player
        .sink()
        .port_name()
        .unwrap_or_else(|| "none".to_string());
    let playback = match ctx.player.current() {
        Some(name) => format!("playing '{}'", name),
        None => "stopped".to_string(),
    };
    let defaults = ctx.session.defaults;

    CommandResult::Message(
        [
            format!("Port: {}", port),
            format!("Playback: {}", playback),
            format!("Patterns: {}", ctx.session.patterns.len()),
            format!(
                "Defaults: vel={} len={} tempo={} BPM",
                defaults.velocity, defaults.length, defaults.tempo
            ),
        ]
        .join("\n"),
    )
}
