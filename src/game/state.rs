use super::direction::Direction;
use crate::consts;
use ratatui::layout::{Position, Size};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Everything that describes one run.  Owned & mutated only by the engine.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct GameState {
    /// The cells occupied by the snake, head first.  Never contains
    /// duplicates.
    pub(crate) snake: VecDeque<Position>,

    /// The direction the snake moved in on the last tick
    pub(crate) direction: Direction,

    /// Turns requested by the player but not yet applied, oldest first
    pub(crate) direction_queue: VecDeque<Direction>,

    /// Cells that have been consumed.  Only ever grows during a run.
    pub(crate) eaten: HashSet<Position>,

    /// The glyph displayed in place of each consumed cell
    pub(crate) corrupted_chars: HashMap<Position, char>,

    /// Cells the snake may currently eat
    pub(crate) active_targets: HashSet<Position>,

    /// The characters that `active_targets` were drawn from
    pub(crate) active_target_chars: Vec<char>,

    /// Cells the snake must avoid
    pub(crate) hazard_cells: HashSet<Position>,

    /// Hazard characters listed in the HUD's "avoid" label
    pub(crate) active_hazard_chars: Vec<char>,

    pub(crate) score: u32,
    pub(crate) stage: u32,
    pub(crate) eaten_count: u32,
    pub(crate) eaten_this_target: u32,
    pub(crate) target_quota: u32,

    /// Rolling cursor into [`TARGET_SEQUENCE`][consts::TARGET_SEQUENCE]
    pub(crate) current_target_index: usize,

    /// Number of ticks for which the tail will stay put
    pub(crate) growth: u32,

    /// Speed multiplier, at least 1.0
    pub(crate) speed: f64,

    pub(crate) running: bool,
    pub(crate) game_over: bool,
    pub(crate) won: bool,
    pub(crate) game_over_reason: Option<EndReason>,
}

impl GameState {
    /// Create the state for a fresh run on a board of the given size: a
    /// three-cell snake heading east with its head just left of center
    pub(crate) fn new(size: Size) -> GameState {
        let x = size.width / 2;
        let y = size.height / 2;
        let snake = (1..=consts::INITIAL_SNAKE_LENGTH)
            .map(|i| Position::new(x.saturating_sub(i), y))
            .collect();
        GameState {
            snake,
            direction: Direction::East,
            direction_queue: VecDeque::new(),
            eaten: HashSet::new(),
            corrupted_chars: HashMap::new(),
            active_targets: HashSet::new(),
            active_target_chars: Vec::new(),
            hazard_cells: HashSet::new(),
            active_hazard_chars: Vec::new(),
            score: 0,
            stage: 1,
            eaten_count: 0,
            eaten_this_target: 0,
            target_quota: consts::targets::INITIAL_QUOTA,
            current_target_index: 0,
            growth: 0,
            speed: 1.0,
            running: false,
            game_over: false,
            won: false,
            game_over_reason: None,
        }
    }

    pub(crate) fn head(&self) -> Option<Position> {
        self.snake.front().copied()
    }

    /// The direction the snake will face once all queued turns are applied
    pub(crate) fn upcoming_direction(&self) -> Direction {
        self.direction_queue
            .back()
            .copied()
            .unwrap_or(self.direction)
    }
}

/// Why a run ended
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum EndReason {
    /// Every target character on the board has been consumed
    Win,
    /// The snake ran into another player's snake
    Player,
    /// The snake ran into a cell it had already consumed
    Corruption,
    /// The snake ran into a protected cell
    Hazard,
    /// The snake ran into a wall or itself
    Crash,
}

impl EndReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            EndReason::Win => "win",
            EndReason::Player => "player",
            EndReason::Corruption => "corruption",
            EndReason::Hazard => "hazard",
            EndReason::Crash => "crash",
        }
    }

    /// The end-of-run message shown for this reason
    pub(crate) fn message(self) -> &'static str {
        match self {
            EndReason::Win => consts::ui_text::FULL_CORRUPTION,
            EndReason::Player => consts::ui_text::PLAYER_CRASH,
            EndReason::Corruption => consts::ui_text::CORRUPTION_CRASH,
            EndReason::Hazard => consts::ui_text::HAZARD_CRASH,
            EndReason::Crash => consts::ui_text::CRASH,
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
