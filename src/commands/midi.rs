//! MIDI REPL commands

use crate::commands::{no_args, Command, CommandContext, CommandResult};
use crate::midi::PortSelector;
use colored::*;
use motif_core::MotifError;

pub const PORTS_USAGE: &str = "ports";
pub const PORT_USAGE: &str = "port <index|name>";

pub fn parse_ports(args: &[&str]) -> Result<Command, MotifError> {
    no_args(args, PORTS_USAGE, Command::Ports)
}

/// Port names may contain spaces, so everything after `port` is the selector
pub fn parse_port(args: &[&str]) -> Result<Command, MotifError> {
    if args.is_empty() {
        return Err(MotifError::usage(PORT_USAGE));
    }
    Ok(Command::Port(PortSelector::parse(&args.join(" "))))
}

/// Handle `ports` command - list available MIDI output ports
pub fn cmd_ports(ctx: &mut CommandContext) -> CommandResult {
    let sink = ctx.player.sink();
    let ports = match sink.list_ports() {
        Ok(ports) => ports,
        Err(e) => return CommandResult::Error(format!("Failed to list MIDI ports: {:#}", e)),
    };

    if ports.is_empty() {
        return CommandResult::Message(
            "No MIDI output ports found. Make sure a MIDI device or virtual port is available."
                .yellow()
                .to_string(),
        );
    }

    let current = sink.port_name();
    let mut output = vec!["🎹 Available MIDI Output Ports:".bold().to_string()];
    for (i, port) in ports.iter().enumerate() {
        let marker = if current.as_deref() == Some(port.as_str()) {
            " (current)".green().to_string()
        } else {
            String::new()
        };
        output.push(format!("  {}: {}{}", i, port.cyan(), marker));
    }
    CommandResult::Message(output.join("\n"))
}

/// Handle `port <index|name>`. Playback is stopped before switching so no
/// note is left hanging on the old port.
pub fn cmd_port(ctx: &mut CommandContext, selector: &PortSelector) -> CommandResult {
    if ctx.player.is_playing() {
        ctx.player.stop();
    }

    match ctx.player.sink().select_port(selector) {
        Ok(name) => CommandResult::Message(format!("🎹 Switched to port: {}", name.green())),
        Err(e) => CommandResult::Error(format!("Error setting port: {:#}", e)),
    }
}
