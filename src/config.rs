use crate::consts;
use crate::net::MAX_PLAYERS_PER_ROOM;
use crate::render::Theme;
use ratatui::layout::Size;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Program configuration read from a configuration file
#[derive(Clone, Deserialize, Debug, Default, Eq, PartialEq)]
pub(crate) struct Config {
    /// Board & audio settings
    #[serde(default)]
    pub(crate) game: GameConfig,

    /// Files to corrupt
    #[serde(default)]
    pub(crate) sources: SourcesConfig,

    /// Overrides for the default colors
    #[serde(default)]
    pub(crate) theme: ThemeConfig,

    /// Settings for sharing a board with other players
    #[serde(default)]
    pub(crate) multiplayer: MultiplayerConfig,

    #[serde(default)]
    pub(crate) logging: LoggingConfig,
}

impl Config {
    /// Return the default configuration file path
    pub(crate) fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_local_dir()
            .map(|p| p.join("snakevirus").join("config.toml"))
            .ok_or(ConfigError::NoPath)
    }

    /// Read configuration from a file on disk.  If the file does not exist and
    /// `allow_missing` is true, a default `Config` value is returned.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file could not be read or if the file's contents
    /// could not be deserialized.
    pub(crate) fn load(path: &Path, allow_missing: bool) -> Result<Config, ConfigError> {
        let content = match fs_err::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
                return Ok(Config::default())
            }
            Err(e) => return Err(ConfigError::Read(e)),
        };
        toml::from_str(&content).map_err(Into::into)
    }
}

#[derive(Clone, Copy, Deserialize, Debug, Eq, PartialEq)]
#[serde(default)]
pub(crate) struct GameConfig {
    /// Fixed board width, overriding the measured terminal size
    pub(crate) width: Option<u16>,

    /// Fixed board height, overriding the measured terminal size
    pub(crate) height: Option<u16>,

    /// Whether starting a run switches the bell on
    pub(crate) audio: bool,

    /// Whether to ring the terminal bell at all
    pub(crate) bell: bool,
}

impl Default for GameConfig {
    fn default() -> GameConfig {
        GameConfig {
            width: None,
            height: None,
            audio: false,
            bell: true,
        }
    }
}

impl GameConfig {
    /// Return the fixed board size, if either dimension is set.  A missing
    /// dimension is taken from the default grid, and neither dimension may
    /// be smaller than the smallest measured board.
    pub(crate) fn board_size(&self) -> Option<Size> {
        if self.width.is_none() && self.height.is_none() {
            return None;
        }
        Some(Size {
            width: self
                .width
                .unwrap_or(consts::DEFAULT_GRID.width)
                .max(consts::MIN_MEASURED_GRID.width),
            height: self
                .height
                .unwrap_or(consts::DEFAULT_GRID.height)
                .max(consts::MIN_MEASURED_GRID.height),
        })
    }
}

#[derive(Clone, Deserialize, Debug, Default, Eq, PartialEq)]
#[serde(try_from = "RawSourcesConfig")]
pub(crate) struct SourcesConfig {
    /// Files making up the corpus; empty for the built-in corpus
    pub(crate) files: Vec<PathBuf>,
}

#[derive(Clone, Deserialize, Debug, Default, Eq, PartialEq)]
#[serde(default)]
struct RawSourcesConfig {
    files: Vec<String>,
}

impl TryFrom<RawSourcesConfig> for SourcesConfig {
    type Error = std::io::Error;

    fn try_from(value: RawSourcesConfig) -> Result<SourcesConfig, std::io::Error> {
        Ok(SourcesConfig {
            files: value
                .files
                .into_iter()
                .map(expanduser::expanduser)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// Style strings like `"bold red on black"` for each part of the board.
/// Unset entries keep their default styles.
#[derive(Clone, Deserialize, Debug, Default, Eq, PartialEq)]
#[serde(default)]
pub(crate) struct ThemeConfig {
    keyword: Option<parse_style::Style>,
    string: Option<parse_style::Style>,
    number: Option<parse_style::Style>,
    comment: Option<parse_style::Style>,
    punct: Option<parse_style::Style>,
    function: Option<parse_style::Style>,
    target: Option<parse_style::Style>,
    hazard: Option<parse_style::Style>,
    corrupted: Option<parse_style::Style>,
    snake: Option<parse_style::Style>,
    remote: Option<parse_style::Style>,
}

impl ThemeConfig {
    pub(crate) fn into_theme(self) -> Theme {
        fn apply(slot: &mut ratatui::style::Style, over: Option<parse_style::Style>) {
            if let Some(style) = over {
                *slot = ratatui::style::Style::from(style);
            }
        }

        let mut theme = Theme::default();
        apply(&mut theme.keyword, self.keyword);
        apply(&mut theme.string, self.string);
        apply(&mut theme.number, self.number);
        apply(&mut theme.comment, self.comment);
        apply(&mut theme.punct, self.punct);
        apply(&mut theme.function, self.function);
        apply(&mut theme.target, self.target);
        apply(&mut theme.hazard, self.hazard);
        apply(&mut theme.corrupted, self.corrupted);
        apply(&mut theme.snake, self.snake);
        apply(&mut theme.remote, self.remote);
        theme
    }
}

#[derive(Clone, Deserialize, Debug, Eq, PartialEq)]
#[serde(try_from = "RawMultiplayerConfig")]
pub(crate) struct MultiplayerConfig {
    /// Player name; if unset, the game is played alone
    pub(crate) name: Option<String>,

    /// Directory shared between players for keeping track of rooms
    room_dir: Option<PathBuf>,

    pub(crate) max_players: usize,
}

impl MultiplayerConfig {
    /// Return the configured room directory or, if that is not set, the
    /// default one under the local data directory
    pub(crate) fn room_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref p) = self.room_dir {
            return Ok(p.clone());
        }
        dirs::data_local_dir()
            .map(|p| p.join("snakevirus").join("rooms"))
            .ok_or(ConfigError::NoDataPath)
    }
}

impl Default for MultiplayerConfig {
    fn default() -> MultiplayerConfig {
        MultiplayerConfig {
            name: None,
            room_dir: None,
            max_players: MAX_PLAYERS_PER_ROOM,
        }
    }
}

#[derive(Clone, Deserialize, Debug, Eq, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
struct RawMultiplayerConfig {
    name: Option<String>,
    room_dir: Option<String>,
    max_players: usize,
}

impl Default for RawMultiplayerConfig {
    fn default() -> RawMultiplayerConfig {
        RawMultiplayerConfig {
            name: None,
            room_dir: None,
            max_players: MAX_PLAYERS_PER_ROOM,
        }
    }
}

impl TryFrom<RawMultiplayerConfig> for MultiplayerConfig {
    type Error = std::io::Error;

    fn try_from(value: RawMultiplayerConfig) -> Result<MultiplayerConfig, std::io::Error> {
        Ok(MultiplayerConfig {
            name: value.name,
            room_dir: value.room_dir.map(expanduser::expanduser).transpose()?,
            max_players: value.max_players.max(1),
        })
    }
}

#[derive(Clone, Deserialize, Debug, Default, Eq, PartialEq)]
#[serde(try_from = "RawLoggingConfig")]
pub(crate) struct LoggingConfig {
    /// File to write logs to; if unset, nothing is logged
    pub(crate) file: Option<PathBuf>,
}

#[derive(Clone, Deserialize, Debug, Default, Eq, PartialEq)]
#[serde(default)]
struct RawLoggingConfig {
    file: Option<String>,
}

impl TryFrom<RawLoggingConfig> for LoggingConfig {
    type Error = std::io::Error;

    fn try_from(value: RawLoggingConfig) -> Result<LoggingConfig, std::io::Error> {
        Ok(LoggingConfig {
            file: value.file.map(expanduser::expanduser).transpose()?,
        })
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to determine path to local configuration directory")]
    NoPath,
    #[error("failed to determine path to local data directory")]
    NoDataPath,
    #[error("failed to read configuration file")]
    Read(#[from] std::io::Error),
    #[error("failed to parse configuration file")]
    Parse(#[from] toml::de::Error),
}
