mod app;
mod audio;
mod command;
mod config;
mod consts;
mod game;
mod grid;
mod highlight;
mod logging;
mod logo;
mod net;
mod render;
mod source;
mod util;
use crate::app::{App, Multiplayer};
use crate::audio::{AudioEngine, SilentAudio, TerminalAudio};
use crate::config::Config;
use crate::game::GameEngine;
use crate::net::{DirBackend, MultiplayerSession};
use crate::render::TerminalRenderer;
use crate::source::SourceTextProvider;
use anyhow::Context;
use lexopt::{Arg, Parser, ValueExt};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

const USAGE: &str = "\
Usage: snakevirus [<options>]

Steer a virus through source code, corrupting it one character at a time

Options:
  -c, --config <PATH>    Read configuration from the given file
  -n, --name <NAME>      Join a shared room under the given player name
      --source <PATH>    Corrupt the given source file (may be repeated)
      --seed <N>         Seed the random number generator
      --log-file <PATH>  Write log messages to the given file
  -h, --help             Show this help and exit
  -V, --version          Show the program version and exit
";

#[derive(Clone, Debug, Eq, PartialEq)]
enum Command {
    Run(Arguments),
    Help,
    Version,
}

impl Command {
    fn from_parser(mut parser: Parser) -> Result<Command, lexopt::Error> {
        let mut args = Arguments::default();
        while let Some(arg) = parser.next()? {
            match arg {
                Arg::Short('h') | Arg::Long("help") => return Ok(Command::Help),
                Arg::Short('V') | Arg::Long("version") => return Ok(Command::Version),
                Arg::Short('c') | Arg::Long("config") => {
                    args.config = Some(PathBuf::from(parser.value()?));
                }
                Arg::Short('n') | Arg::Long("name") => {
                    args.name = Some(parser.value()?.string()?);
                }
                Arg::Long("source") => args.sources.push(PathBuf::from(parser.value()?)),
                Arg::Long("seed") => args.seed = Some(parser.value()?.parse()?),
                Arg::Long("log-file") => args.log_file = Some(PathBuf::from(parser.value()?)),
                _ => return Err(arg.unexpected()),
            }
        }
        Ok(Command::Run(args))
    }
}

/// Command-line settings, each overriding its counterpart in the
/// configuration file
#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct Arguments {
    config: Option<PathBuf>,
    name: Option<String>,
    sources: Vec<PathBuf>,
    seed: Option<u64>,
    log_file: Option<PathBuf>,
}

impl Arguments {
    fn run(self) -> anyhow::Result<()> {
        let loaded = if let Some(ref path) = self.config {
            Config::load(path, false)
        } else {
            Config::default_path().and_then(|path| Config::load(&path, true))
        };
        let config = loaded.context("failed to load configuration")?;

        if let Some(path) = self.log_file.as_ref().or(config.logging.file.as_ref()) {
            logging::init(path)?;
        }

        let mut rng = match self.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::from_rng(&mut rand::rng()),
        };
        let source_rng = ChaCha12Rng::from_rng(&mut rng);
        let files = if self.sources.is_empty() {
            &config.sources.files
        } else {
            &self.sources
        };
        let source =
            SourceTextProvider::from_files(files, source_rng).context("failed to load source files")?;

        let multiplayer = match self.name.or_else(|| config.multiplayer.name.clone()) {
            Some(name) => {
                let room_dir = config.multiplayer.room_dir()?;
                info!(room_dir = %room_dir.display(), "Multiplayer enabled");
                Some(Multiplayer {
                    session: MultiplayerSession::new(
                        DirBackend::new(room_dir),
                        config.multiplayer.max_players,
                    ),
                    name,
                })
            }
            None => None,
        };

        let renderer = TerminalRenderer::new(config.theme.into_theme(), config.game.board_size());
        let audio: Box<dyn AudioEngine> = if config.game.bell {
            Box::new(TerminalAudio::new(io::stdout(), config.game.audio))
        } else {
            Box::new(SilentAudio)
        };
        let engine = GameEngine::new(renderer, audio, source, rng);
        info!(seed = ?self.seed, "Starting snakevirus");
        let terminal = ratatui::init();
        let r = App::new(engine, multiplayer).run(terminal);
        ratatui::restore();
        r.map_err(Into::into)
    }
}

fn main() -> ExitCode {
    match Command::from_parser(Parser::from_env()) {
        Ok(Command::Run(args)) => exit(args.run()),
        Ok(Command::Help) => {
            print!("{USAGE}");
            ExitCode::SUCCESS
        }
        Ok(Command::Version) => {
            println!("snakevirus {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("snakevirus: {e}\n\n{USAGE}");
            ExitCode::from(2)
        }
    }
}

fn exit(r: anyhow::Result<()>) -> ExitCode {
    match r {
        Ok(()) => ExitCode::SUCCESS,
        Err(e)
            if e
                .downcast_ref::<io::Error>()
                .is_some_and(|ioe| ioe.kind() == ErrorKind::BrokenPipe) =>
        {
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("snakevirus: {e:?}");
            ExitCode::from(2)
        }
    }
}
