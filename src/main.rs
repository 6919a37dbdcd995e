use clap::{value_parser, Arg, ArgAction, Command};
use colored::*;
use motif::midi::{MemorySink, MidiOutputSink, OutputSink, PortSelector};
use motif::repl::{self, Repl};
use motif::CommandContext;
use motif_core::state::{DEFAULT_LENGTH, DEFAULT_TEMPO, DEFAULT_VELOCITY};
use motif_core::{Defaults, Session};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

fn main() -> anyhow::Result<()> {
    let matches = Command::new("motif")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Live MIDI pattern REPL")
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .value_name("NAME|INDEX")
                .help("MIDI output port to open at startup")
                .num_args(1),
        )
        .arg(
            Arg::new("tempo")
                .long("tempo")
                .value_name("BPM")
                .value_parser(value_parser!(i64)),
        )
        .arg(
            Arg::new("velocity")
                .long("velocity")
                .value_name("VEL")
                .value_parser(value_parser!(i64)),
        )
        .arg(
            Arg::new("length")
                .long("length")
                .value_name("BEATS")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("script")
                .long("script")
                .short('s')
                .value_name("FILE")
                .help("Run commands from a file, let playback finish, then exit")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Record MIDI in memory instead of opening a port")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Raise log level (repeatable)")
                .action(ArgAction::Count),
        )
        .get_matches();

    init_logging(matches.get_count("verbose"));

    let velocity = matches
        .get_one::<i64>("velocity")
        .copied()
        .unwrap_or(DEFAULT_VELOCITY as i64);
    let length = matches
        .get_one::<f64>("length")
        .copied()
        .unwrap_or(DEFAULT_LENGTH);
    let tempo = matches
        .get_one::<i64>("tempo")
        .copied()
        .unwrap_or(DEFAULT_TEMPO as i64);
    let defaults = Defaults::new(velocity, length, tempo)?;

    let sink: Arc<dyn OutputSink> = if matches.get_flag("dry-run") {
        Arc::new(MemorySink::new())
    } else {
        let selector = matches
            .get_one::<String>("port")
            .map(|port| PortSelector::parse(port));
        open_output(selector.as_ref())
    };

    let mut ctx = CommandContext::new(Session::with_defaults(defaults), sink);

    match matches.get_one::<PathBuf>("script") {
        Some(path) => {
            repl::run_script(path, &mut ctx)?;
            Ok(())
        }
        None => {
            let mut repl = Repl::new(ctx)?;
            repl.run()
        }
    }
}

/// Logs go to stderr so they never interleave with command output
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Open the requested port, falling back to a disconnected sink so the
/// session still works for building and editing patterns
fn open_output(selector: Option<&PortSelector>) -> Arc<dyn OutputSink> {
    match MidiOutputSink::open(selector) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            tracing::warn!("Starting without MIDI output: {:#}", e);
            println!("{} {:#}", "✗ No MIDI output:".yellow(), e);
            Arc::new(MidiOutputSink::disconnected())
        }
    }
}
