//! Assorted constants & hard-coded tuning
use ratatui::{
    layout::Size,
    style::{Color, Modifier, Style},
};
use std::time::Duration;

/// Board size used when the display surface can't report a usable size
pub(crate) const DEFAULT_GRID: Size = Size {
    width: 72,
    height: 30,
};

/// Smallest board the terminal renderer will report when measuring
pub(crate) const MIN_MEASURED_GRID: Size = Size {
    width: 24,
    height: 12,
};

/// Characters the virus hunts for, cycled through in this order
pub(crate) const TARGET_SEQUENCE: [char; 24] = [
    '{', '}', '(', ')', '[', ']', ';', '=', '<', '>', 'a', 'e', 'i', 'o', 'u', 's', 'r', 't', 'n',
    'l', 'c', 'd', 'm', 'f',
];

/// Characters from which protected ("hazard") cells are drawn
pub(crate) const HAZARD_SEQUENCE: [char; 16] = [
    ':', '.', ',', '"', '\'', '`', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Glyphs displayed in place of consumed cells
pub(crate) const CORRUPTION_CHARS: [char; 18] = [
    '#', '@', '%', '&', '*', '?', '!', '+', '=', '~', '$', '^', '/', '\\', '|', '<', '>', '_',
];

/// Identifiers highlighted as keywords
pub(crate) const KEYWORDS: [&str; 25] = [
    "const", "let", "var", "function", "return", "if", "else", "for", "while", "class", "new",
    "true", "false", "null", "undefined", "switch", "case", "break", "continue", "try", "catch",
    "finally", "import", "from", "export",
];

/// Target selection tuning
pub(crate) mod targets {
    /// Fewest distinct target characters active at once
    pub(crate) const MIN_CHARS: usize = 2;
    /// Most distinct target characters active at once
    pub(crate) const MAX_CHARS: usize = 4;
    /// Cells eaten per extra active target character
    pub(crate) const CHAR_GROWTH_STEP: u32 = 22;
    /// Cells kept per target character at score zero
    pub(crate) const PER_CHAR_BASE: usize = 8;
    pub(crate) const PER_CHAR_MAX: usize = 20;
    /// Score needed per extra cell kept per character
    pub(crate) const PER_CHAR_SCORE_STEP: u32 = 120;
    pub(crate) const BASE_QUOTA: u32 = 8;
    pub(crate) const MAX_QUOTA: u32 = 20;
    /// Score needed per extra unit of quota
    pub(crate) const QUOTA_SCORE_STEP: u32 = 70;
    /// Quota of a freshly created run, before the first pick
    pub(crate) const INITIAL_QUOTA: u32 = 7;
}

/// Hazard tuning
pub(crate) mod hazards {
    /// No hazards appear until this many cells have been eaten
    pub(crate) const UNLOCK_AT_EATEN: u32 = 8;
    pub(crate) const BASE_COUNT: usize = 4;
    /// Cells eaten per hazard growth step
    pub(crate) const GROWTH_STEP: u32 = 6;
    /// Hazards added per growth step
    pub(crate) const GROWTH_PER_STEP: usize = 3;
    pub(crate) const MAX_COUNT: usize = 100;
    /// Maximum number of hazard characters listed in the "avoid" label
    pub(crate) const LABEL_CHARS: usize = 4;
}

/// Speed curve tuning
pub(crate) mod speed {
    /// Tick period at speed 1.0, in milliseconds
    pub(crate) const BASE_DELAY_MS: u32 = 180;
    /// Tick period floor, in milliseconds
    pub(crate) const MIN_DELAY_MS: u32 = 60;
    pub(crate) const MAX_MULTIPLIER: f64 = 2.75;
    pub(crate) const INCREASE_PER_EAT: f64 = 0.03;
}

/// Number of corrupted cells per stage
pub(crate) const CORRUPTIONS_PER_LEVEL: u32 = 10;

/// Points awarded per eaten cell on top of the snake's length
pub(crate) const EAT_SCORE_BASE: u32 = 12;

/// Length of the snake at the start of a run
pub(crate) const INITIAL_SNAKE_LENGTH: u16 = 3;

/// Maximum number of pending turns
pub(crate) const DIRECTION_QUEUE_LIMIT: usize = 2;

/// Path label used when a source window carries no `// source:` marker
pub(crate) const UNKNOWN_SOURCE_PATH: &str = "unknown.js";

/// Marker line prefix naming the file a source window came from
pub(crate) const SOURCE_MARKER: &str = "// source:";

/// How long the glitch pulse stays on screen
pub(crate) const GLITCH_DURATION: Duration = Duration::from_millis(130);

/// Width of the line-number gutter drawn left of the board
pub(crate) const GUTTER_WIDTH: u16 = 4;

pub(crate) mod ui_text {
    pub(crate) const READY: &str = "Press Space to unleash Snake Virus.";
    pub(crate) const FULL_CORRUPTION: &str = "System fully corrupted. Press Space to run again.";
    pub(crate) const CRASH: &str = "Virus crashed. Press Space to re-run.";
    pub(crate) const HAZARD_CRASH: &str = "Virus hit protected code. Press Space to re-run.";
    pub(crate) const CORRUPTION_CRASH: &str =
        "Virus consumed corrupted code. Press Space to re-run.";
    pub(crate) const PLAYER_CRASH: &str =
        "Virus collided with another player. Press Space to re-run.";
}

/// Glyph for the snake's head when it has crashed
pub(crate) const COLLISION_SYMBOL: char = '×';

/// Style for the HUD bar at the top of the screen
pub(crate) const HUD_STYLE: Style = Style::new().add_modifier(Modifier::REVERSED);

/// Style for key codes shown in the interface
pub(crate) const KEY_STYLE: Style = Style::new().fg(Color::Yellow);

/// Style for the "SNAKE" half of the logo
pub(crate) const LOGO_SNAKE_STYLE: Style = Style::new().fg(Color::LightGreen);

/// Style for the "VIRUS" half of the logo
pub(crate) const LOGO_VIRUS_STYLE: Style = Style::new().fg(Color::LightRed);

/// Style for line numbers in the gutter
pub(crate) const GUTTER_STYLE: Style = Style::new().fg(Color::DarkGray);

/// Style for [`COLLISION_SYMBOL`]
pub(crate) const COLLISION_STYLE: Style = Style::new()
    .fg(Color::LightRed)
    .add_modifier(Modifier::REVERSED);
