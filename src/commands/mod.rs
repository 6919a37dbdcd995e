//! Command registry for REPL commands
//!
//! A line is split on whitespace, its first word looked up case-insensitively
//! in the registry, and the arguments parsed into a [`Command`]. Argument
//! counts, numbers, ranges and transform parameters are all checked there, so
//! the handlers only ever see valid values.

pub mod general;
pub mod midi;
pub mod pattern;
pub mod playback;

use crate::midi::{OutputSink, PortSelector};
use crate::playback::Player;
use motif_core::{ErrorCategory, MotifError, Session, Transform};
use std::sync::Arc;

/// Result of executing a command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Nothing to show (blank line or comment)
    Success,
    /// Command executed, show this message
    Message(String),
    /// Exit the REPL
    Exit,
    /// Bad input or unknown name; nothing was changed
    Rejected(MotifError),
    /// Output port or playback failure
    Error(String),
}

impl CommandResult {
    /// Category and text of a failed command
    pub fn failure(&self) -> Option<(ErrorCategory, String)> {
        match self {
            CommandResult::Rejected(e) => Some((e.category(), e.to_string())),
            CommandResult::Error(message) => Some((ErrorCategory::Resource, message.clone())),
            _ => None,
        }
    }

    /// One-line rendering of a failure, e.g. `Error [lookup]: Pattern 'x' not found`
    pub fn error_line(&self) -> Option<String> {
        self.failure()
            .map(|(category, message)| format!("Error [{}]: {}", category, message))
    }
}

impl From<MotifError> for CommandResult {
    fn from(e: MotifError) -> Self {
        CommandResult::Rejected(e)
    }
}

/// State passed to every command handler
pub struct CommandContext {
    pub session: Session,
    pub player: Player,
}

impl CommandContext {
    pub fn new(session: Session, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            session,
            player: Player::new(sink),
        }
    }

    /// Stop playback and release the output port
    pub fn shutdown(&mut self) {
        self.player.stop();
        self.player.sink().close();
    }
}

/// A fully parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pattern {
        name: String,
        beats: i64,
        notes: Vec<String>,
    },
    Sequence(Vec<String>),
    /// `None` shows the current value
    Velocity(Option<u8>),
    Length(Option<f64>),
    Tempo(Option<u16>),
    Play(String),
    Stop,
    Modify {
        name: String,
        transform: Transform,
    },
    List,
    Show(String),
    Delete(String),
    Clear,
    Ports,
    Port(PortSelector),
    Status,
    Help(Option<String>),
    Exit,
}

/// Grouping used by `help`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Patterns,
    Defaults,
    Playback,
    Midi,
    Modify,
    Utility,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Patterns,
        Section::Defaults,
        Section::Playback,
        Section::Midi,
        Section::Modify,
        Section::Utility,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Section::Patterns => "Pattern Creation:",
            Section::Defaults => "Defaults:",
            Section::Playback => "Playback:",
            Section::Midi => "MIDI Setup:",
            Section::Modify => "Modification:",
            Section::Utility => "Utility:",
        }
    }
}

/// Parses the arguments that follow a command word
pub type ArgParser = fn(&[&str]) -> Result<Command, MotifError>;

/// One entry in the command table
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub summary: &'static str,
    pub section: Section,
    pub parse: ArgParser,
}

impl CommandSpec {
    fn matches(&self, word: &str) -> bool {
        self.name == word || self.aliases.contains(&word)
    }
}

/// Registry of available commands
pub struct CommandRegistry {
    commands: Vec<CommandSpec>,
}

impl CommandRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn register(&mut self, spec: CommandSpec) {
        self.commands.push(spec);
    }

    pub fn find(&self, word: &str) -> Option<&CommandSpec> {
        let word = word.to_lowercase();
        self.commands.iter().find(|spec| spec.matches(&word))
    }

    pub fn specs(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.iter()
    }

    /// Parse a line. Blank lines and `#` comments give `Ok(None)`.
    pub fn parse(&self, line: &str) -> Result<Option<Command>, MotifError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (word, args) = match tokens.split_first() {
            Some(split) => split,
            None => return Ok(None),
        };
        let spec = self
            .find(word)
            .ok_or_else(|| MotifError::UnknownCommand(word.to_lowercase()))?;
        (spec.parse)(args).map(Some)
    }

    /// Parse and run one line
    pub fn execute(&self, line: &str, ctx: &mut CommandContext) -> CommandResult {
        match self.parse(line) {
            Ok(Some(command)) => self.dispatch(command, ctx),
            Ok(None) => CommandResult::Success,
            Err(e) => e.into(),
        }
    }

    /// Route a parsed command to its handler
    pub fn dispatch(&self, command: Command, ctx: &mut CommandContext) -> CommandResult {
        match command {
            Command::Pattern { name, beats, notes } => {
                pattern::cmd_pattern(ctx, &name, beats, &notes)
            }
            Command::Sequence(notes) => pattern::cmd_sequence(ctx, &notes),
            Command::Velocity(value) => pattern::cmd_velocity(ctx, value),
            Command::Length(value) => pattern::cmd_length(ctx, value),
            Command::Tempo(value) => pattern::cmd_tempo(ctx, value),
            Command::Modify { name, transform } => pattern::cmd_modify(ctx, &name, transform),
            Command::List => pattern::cmd_list(ctx),
            Command::Show(name) => pattern::cmd_show(ctx, &name),
            Command::Delete(name) => pattern::cmd_delete(ctx, &name),
            Command::Clear => pattern::cmd_clear(ctx),
            Command::Play(name) => playback::cmd_play(ctx, &name),
            Command::Stop => playback::cmd_stop(ctx),
            Command::Ports => midi::cmd_ports(ctx),
            Command::Port(selector) => midi::cmd_port(ctx, &selector),
            Command::Status => general::cmd_status(ctx),
            Command::Help(topic) => general::cmd_help(self, topic.as_deref()),
            Command::Exit => CommandResult::Exit,
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject any arguments for commands that take none
pub(crate) fn no_args(args: &[&str], usage: &str, command: Command) -> Result<Command, MotifError> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(MotifError::usage(usage))
    }
}

/// Exactly one argument, returned as an owned string
pub(crate) fn single_arg(args: &[&str], usage: &str) -> Result<String, MotifError> {
    match args {
        [arg] => Ok(arg.to_string()),
        _ => Err(MotifError::usage(usage)),
    }
}

/// Create a fully populated command registry with all built-in commands
pub fn create_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    registry.register(CommandSpec {
        name: "pat",
        aliases: &[],
        usage: pattern::PAT_USAGE,
        summary: "Create pattern spread over N beats",
        section: Section::Patterns,
        parse: pattern::parse_pattern,
    });
    registry.register(CommandSpec {
        name: "seq",
        aliases: &[],
        usage: pattern::SEQ_USAGE,
        summary: "Quick sequence, one note length apart (saved as '_seq')",
        section: Section::Patterns,
        parse: pattern::parse_sequence,
    });

    registry.register(CommandSpec {
        name: "vel",
        aliases: &[],
        usage: pattern::VEL_USAGE,
        summary: "Velocity for new notes",
        section: Section::Defaults,
        parse: pattern::parse_velocity,
    });
    registry.register(CommandSpec {
        name: "len",
        aliases: &[],
        usage: pattern::LEN_USAGE,
        summary: "Note length for new notes",
        section: Section::Defaults,
        parse: pattern::parse_length,
    });
    registry.register(CommandSpec {
        name: "tempo",
        aliases: &[],
        usage: pattern::TEMPO_USAGE,
        summary: "Tempo for new patterns",
        section: Section::Defaults,
        parse: pattern::parse_tempo,
    });

    registry.register(CommandSpec {
        name: "play",
        aliases: &[],
        usage: playback::PLAY_USAGE,
        summary: "Play pattern via MIDI ♪",
        section: Section::Playback,
        parse: playback::parse_play,
    });
    registry.register(CommandSpec {
        name: "stop",
        aliases: &[],
        usage: playback::STOP_USAGE,
        summary: "Stop playback and silence all notes ■",
        section: Section::Playback,
        parse: playback::parse_stop,
    });

    registry.register(CommandSpec {
        name: "ports",
        aliases: &[],
        usage: midi::PORTS_USAGE,
        summary: "List available MIDI output ports",
        section: Section::Midi,
        parse: midi::parse_ports,
    });
    registry.register(CommandSpec {
        name: "port",
        aliases: &[],
        usage: midi::PORT_USAGE,
        summary: "Switch MIDI output port",
        section: Section::Midi,
        parse: midi::parse_port,
    });

    registry.register(CommandSpec {
        name: "mod",
        aliases: &[],
        usage: pattern::MOD_USAGE,
        summary: "Transform a pattern: trans <semi>, rev, double, half, shift <beats>",
        section: Section::Modify,
        parse: pattern::parse_modify,
    });

    registry.register(CommandSpec {
        name: "list",
        aliases: &[],
        usage: pattern::LIST_USAGE,
        summary: "List all patterns",
        section: Section::Utility,
        parse: pattern::parse_list,
    });
    registry.register(CommandSpec {
        name: "show",
        aliases: &[],
        usage: pattern::SHOW_USAGE,
        summary: "Show pattern details",
        section: Section::Utility,
        parse: pattern::parse_show,
    });
    registry.register(CommandSpec {
        name: "del",
        aliases: &[],
        usage: pattern::DEL_USAGE,
        summary: "Delete pattern",
        section: Section::Utility,
        parse: pattern::parse_delete,
    });
    registry.register(CommandSpec {
        name: "clear",
        aliases: &[],
        usage: pattern::CLEAR_USAGE,
        summary: "Clear all patterns and defaults",
        section: Section::Utility,
        parse: pattern::parse_clear,
    });
    registry.register(CommandSpec {
        name: "status",
        aliases: &[],
        usage: general::STATUS_USAGE,
        summary: "Show playback, port and defaults",
        section: Section::Utility,
        parse: general::parse_status,
    });
    registry.register(CommandSpec {
        name: "help",
        aliases: &["?"],
        usage: general::HELP_USAGE,
        summary: "Show this help, or usage for one command",
        section: Section::Utility,
        parse: general::parse_help,
    });
    registry.register(CommandSpec {
        name: "exit",
        aliases: &["quit", "q"],
        usage: general::EXIT_USAGE,
        summary: "Stop playback and quit",
        section: Section::Utility,
        parse: general::parse_exit,
    });

    registry
}
