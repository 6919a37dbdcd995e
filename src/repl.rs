//! REPL (Read-Eval-Print Loop) and script runner for motif commands

use crate::commands::{create_registry, CommandContext, CommandRegistry, CommandResult};
use anyhow::{Context, Result};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RustylineResult};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// How often a script run checks whether playback has finished
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Interactive REPL over a [`CommandContext`]
pub struct Repl {
    editor: DefaultEditor,
    registry: CommandRegistry,
    ctx: CommandContext,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(ctx: CommandContext) -> RustylineResult<Self> {
        Ok(Repl {
            editor: DefaultEditor::new()?,
            registry: create_registry(),
            ctx,
        })
    }

    /// Start the REPL loop. Playback is stopped and the port closed on the
    /// way out, however the loop ends.
    pub fn run(&mut self) -> Result<()> {
        println!(
            "{} {}",
            "🎹".bright_yellow(),
            "motif: live MIDI patterns".bright_cyan().bold()
        );
        match self.ctx.player.sink().port_name() {
            Some(port) => println!("MIDI output: {}", port.green()),
            None => println!(
                "{}",
                "No MIDI output connected (use 'ports' and 'port <n>')".yellow()
            ),
        }
        println!(
            "Type '{}' for commands, '{}' or {} to exit.\n",
            "help".bright_green(),
            "exit".bright_red(),
            "Ctrl+D".bright_red()
        );

        let result = self.read_loop();
        self.ctx.shutdown();
        println!("{} 🎵", "Goodbye!".bright_cyan());
        result
    }

    fn read_loop(&mut self) -> Result<()> {
        loop {
            let prompt = format!("{} ", "motif>".bright_magenta().bold());
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    self.editor.add_history_entry(line.to_owned())?;

                    let result = self.registry.execute(line, &mut self.ctx);
                    if !print_result(result) {
                        return Ok(());
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C silences playback but keeps the session
                    self.ctx.player.stop();
                    println!("{}", "(Use 'exit' or Ctrl+D to quit)".dimmed());
                }
                Err(ReadlineError::Eof) => return Ok(()),
                Err(err) => {
                    println!(
                        "{} {}",
                        "Error reading input:".bright_red().bold(),
                        err.to_string().red()
                    );
                    return Err(err.into());
                }
            }
        }
    }
}

/// Print a command result. Returns `false` when the session should end.
pub fn print_result(result: CommandResult) -> bool {
    match result {
        CommandResult::Success => true,
        CommandResult::Message(msg) => {
            println!("{}", msg);
            true
        }
        CommandResult::Exit => false,
        failed => {
            if let Some((category, message)) = failed.failure() {
                let label = format!("Error [{}]:", category);
                println!("{} {}", label.bright_red().bold(), message.red());
            }
            true
        }
    }
}

/// Run every line of `path` as a command, then let playback finish and tear
/// down. Stops early at `exit`. Returns the result of each executed line.
pub fn run_script(path: &Path, ctx: &mut CommandContext) -> Result<Vec<CommandResult>> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    let registry = create_registry();
    let mut results = Vec::new();

    let mut exited = false;
    for line in source.lines() {
        let result = registry.execute(line, ctx);
        if !matches!(result, CommandResult::Success) {
            println!("{} {}", "motif>".dimmed(), line.trim());
        }
        exited = !print_result(result.clone());
        results.push(result);
        if exited {
            break;
        }
    }

    // An explicit `exit` cuts playback short; running off the end lets it finish
    if !exited {
        while ctx.player.is_playing() {
            thread::sleep(DRAIN_POLL);
        }
    }
    ctx.shutdown();
    tracing::debug!(path = %path.display(), lines = results.len(), "Script finished");
    Ok(results)
}
