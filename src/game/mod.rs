mod direction;
mod hazards;
mod state;
mod targets;
mod timer;
pub(crate) use self::direction::Direction;
pub(crate) use self::state::{EndReason, GameState};
use self::timer::{tick_delay, TickTimer};
use crate::audio::AudioEngine;
use crate::consts::{self, ui_text};
use crate::grid::CodeGrid;
use crate::highlight::StyleGrid;
use crate::render::{BoardView, Hud, Renderer};
use crate::source::{extract_source_path, SourceProvider};
use rand::{seq::IndexedRandom, Rng};
use ratatui::layout::{Position, Size};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Another player's snake as seen by the local engine
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RemotePlayer {
    pub(crate) name: String,
    pub(crate) score: u32,
    pub(crate) stage: u32,
    pub(crate) snake: Vec<Position>,
}

/// The read-only view of a run that is shared with other players
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RunSnapshot {
    pub(crate) score: u32,
    pub(crate) stage: u32,
    pub(crate) running: bool,
    pub(crate) game_over: bool,
    pub(crate) game_over_reason: Option<EndReason>,
    pub(crate) snake: Vec<Position>,
}

type GameOverHook = Box<dyn FnMut(EndReason)>;

/// Owns a run's [`GameState`] and the board it is played on, and drives the
/// state machine `idle → running → game over → (reset) → idle`.
///
/// The engine draws through a [`Renderer`], makes noise through an
/// [`AudioEngine`], obtains board text from a [`SourceProvider`], and takes
/// all randomness from `R`.  Ticks are scheduled by an internal
/// [`TickTimer`] that the caller services by calling
/// [`GameEngine::poll_timer()`] no later than [`GameEngine::next_deadline()`].
pub(crate) struct GameEngine<V, A, S, R> {
    renderer: V,
    audio: A,
    source: S,
    rng: R,
    on_game_over: Option<GameOverHook>,
    source_path: String,
    grid: CodeGrid,
    styles: StyleGrid,
    board_size: Size,
    remote_players: Vec<RemotePlayer>,
    state: GameState,
    timer: Option<TickTimer>,
}

impl<V: Renderer, A: AudioEngine, S: SourceProvider, R: Rng> GameEngine<V, A, S, R> {
    /// Create an engine with a placeholder board.  Call
    /// [`reset()`][GameEngine::reset] before starting a run.
    pub(crate) fn new(renderer: V, audio: A, source: S, rng: R) -> Self {
        let board_size = consts::DEFAULT_GRID;
        GameEngine {
            renderer,
            audio,
            source,
            rng,
            on_game_over: None,
            source_path: String::from(consts::UNKNOWN_SOURCE_PATH),
            grid: CodeGrid::build("", board_size),
            styles: StyleGrid::default(),
            board_size,
            remote_players: Vec::new(),
            state: GameState::new(board_size),
            timer: None,
        }
    }

    /// Register a function to be called with the reason whenever a run ends
    pub(crate) fn set_on_game_over<F: FnMut(EndReason) + 'static>(&mut self, hook: F) {
        self.on_game_over = Some(Box::new(hook));
    }

    pub(crate) fn set_remote_players(&mut self, players: Vec<RemotePlayer>) {
        self.remote_players = players;
        self.render();
    }

    pub(crate) fn state(&self) -> &GameState {
        &self.state
    }

    pub(crate) fn board_size(&self) -> Size {
        self.board_size
    }

    pub(crate) fn renderer(&self) -> &V {
        &self.renderer
    }

    pub(crate) fn renderer_mut(&mut self) -> &mut V {
        &mut self.renderer
    }

    pub(crate) fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            score: self.state.score,
            stage: self.state.stage,
            running: self.state.running,
            game_over: self.state.game_over,
            game_over_reason: self.state.game_over_reason,
            snake: self.state.snake.iter().copied().collect(),
        }
    }

    /// Throw away the current run and set up a fresh one on a newly built
    /// board, ready to be started
    pub(crate) fn reset(&mut self) {
        self.stop_loop();
        self.audio.set_playback_active(false);
        self.board_size = self.compute_board_size();
        self.rebuild_board();
        self.state = GameState::new(self.board_size);
        info!(
            width = self.board_size.width,
            height = self.board_size.height,
            source = %self.source_path,
            "Reset game"
        );
        self.pick_next_targets();
        self.refresh_hazards(false);
        self.sync_hud();
        if !self.state.game_over {
            self.renderer.set_message(ui_text::READY);
        }
        self.render();
    }

    /// Begin a run.  Does nothing if a run is already in progress; a finished
    /// run is reset first.
    pub(crate) fn start(&mut self) {
        if self.state.running {
            return;
        }
        if self.state.game_over {
            self.reset();
            if self.state.game_over {
                return;
            }
        }
        if !self.audio.is_enabled() {
            self.audio.ensure_enabled_for_gameplay();
        }
        self.state.running = true;
        self.audio.set_playback_active(true);
        self.audio.set_game_speed(self.state.speed);
        self.audio.play_start_sfx();
        let msg = self.progress_message();
        self.renderer.set_message(&msg);
        self.sync_hud();
        self.update_loop_speed();
        info!(stage = self.state.stage, "Run started");
    }

    /// Queue a turn.  Turns that would reverse the snake onto itself or that
    /// repeat the latest queued heading are ignored; at most
    /// [`DIRECTION_QUEUE_LIMIT`][consts::DIRECTION_QUEUE_LIMIT] turns are
    /// kept, dropping the oldest.
    pub(crate) fn set_direction(&mut self, direction: Direction) {
        let upcoming = self.state.upcoming_direction();
        if direction == upcoming || direction == upcoming.reverse() {
            return;
        }
        self.state.direction_queue.push_back(direction);
        while self.state.direction_queue.len() > consts::DIRECTION_QUEUE_LIMIT {
            self.state.direction_queue.pop_front();
        }
    }

    pub(crate) fn toggle_audio(&mut self) {
        self.audio.toggle();
        self.sync_hud();
    }

    pub(crate) fn dispose(&mut self) {
        self.stop_loop();
        self.audio.dispose();
    }

    /// Cancel the tick timer, if any
    pub(crate) fn stop_loop(&mut self) {
        self.timer = None;
    }

    /// The time by which [`poll_timer()`][GameEngine::poll_timer] should next
    /// be called, or `None` if no run is ticking
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.timer.as_ref().map(TickTimer::deadline)
    }

    /// Advance the game by one tick if the timer has come due.  Returns `true`
    /// if a tick happened.
    pub(crate) fn poll_timer(&mut self, now: Instant) -> bool {
        let fired = self.timer.as_mut().is_some_and(|t| t.fire(now));
        if fired {
            self.tick();
        }
        fired
    }

    /// Move the snake one cell and apply the consequences
    pub(crate) fn tick(&mut self) {
        if !self.state.running || self.state.game_over {
            return;
        }
        if let Some(d) = self.state.direction_queue.pop_front() {
            self.state.direction = d;
        }
        let Some(head) = self.state.head() else {
            return;
        };
        let Some(next) = self.state.direction.advance(head, self.board_size) else {
            self.end_game(EndReason::Crash);
            return;
        };
        if self.state.snake.contains(&next) {
            self.end_game(EndReason::Crash);
            return;
        }
        if self.remote_players.iter().any(|p| p.snake.contains(&next)) {
            self.end_game(EndReason::Player);
            return;
        }
        if self.state.eaten.contains(&next) {
            self.end_game(EndReason::Corruption);
            return;
        }
        if self.state.hazard_cells.contains(&next) {
            self.end_game(EndReason::Hazard);
            return;
        }

        self.state.snake.push_front(next);
        let mut leveled_up = false;
        if self.state.active_targets.contains(&next) {
            leveled_up = self.eat_target(next);
        } else if self.state.growth > 0 {
            self.state.growth -= 1;
        } else {
            self.state.snake.pop_back();
        }

        if self.state.game_over {
            self.sync_hud();
            self.render();
            return;
        }
        self.refresh_hazards(false);
        self.sync_hud();
        if !leveled_up {
            let msg = self.progress_message();
            self.renderer.set_message(&msg);
        }
        self.update_loop_speed();
        self.render();
    }

    /// Consume the target at `cell`.  Returns `true` if this advanced the
    /// stage.
    fn eat_target(&mut self, cell: Position) -> bool {
        self.state.active_targets.remove(&cell);
        self.state.eaten.insert(cell);
        let glyph = consts::CORRUPTION_CHARS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or('#');
        self.state.corrupted_chars.insert(cell, glyph);
        self.state.hazard_cells.remove(&cell);
        self.state.eaten_count += 1;
        self.state.eaten_this_target += 1;
        let length = u32::try_from(self.state.snake.len()).unwrap_or(u32::MAX);
        self.state.score = self
            .state
            .score
            .saturating_add(consts::EAT_SCORE_BASE.saturating_add(length));
        self.state.growth += 1;
        self.state.speed = f64::from(self.state.eaten_count)
            .mul_add(consts::speed::INCREASE_PER_EAT, 1.0)
            .min(consts::speed::MAX_MULTIPLIER);
        self.audio.set_game_speed(self.state.speed);
        self.renderer.trigger_glitch();
        self.audio.play_eat_sfx();

        if self.check_stage_progress() {
            return true;
        }
        if self.state.eaten_this_target >= self.state.target_quota {
            if self.pick_next_targets() {
                self.refresh_hazards(true);
            }
        } else if self.state.active_targets.is_empty() {
            self.pick_next_targets();
        }
        false
    }

    /// Advance as many stages as the eaten count calls for.  Returns `true` if
    /// at least one stage was entered.
    fn check_stage_progress(&mut self) -> bool {
        let next_stage = 1 + self.state.eaten_count / consts::CORRUPTIONS_PER_LEVEL;
        if next_stage <= self.state.stage {
            return false;
        }
        while self.state.stage < next_stage && !self.state.game_over {
            self.state.stage += 1;
            self.advance_stage();
        }
        true
    }

    fn advance_stage(&mut self) {
        self.rebuild_board();
        self.state.active_targets.clear();
        self.state.hazard_cells.clear();
        self.state.active_hazard_chars.clear();
        self.state.eaten_this_target = 0;
        info!(stage = self.state.stage, source = %self.source_path, "Entering new stage");
        if !self.pick_next_targets() {
            return;
        }
        self.refresh_hazards(true);
        self.renderer.trigger_glitch();
        self.audio.play_start_sfx();
        let msg = format!(
            "Stage {} breach. Injecting {}.",
            self.state.stage, self.source_path
        );
        self.renderer.set_message(&msg);
    }

    /// Finish the run for the given reason
    fn end_game(&mut self, reason: EndReason) {
        self.state.running = false;
        self.state.game_over = true;
        self.state.won = reason == EndReason::Win;
        self.state.game_over_reason = Some(reason);
        self.stop_loop();
        self.audio.set_playback_active(false);
        if reason != EndReason::Win {
            self.audio.play_crash_sfx();
        }
        self.renderer.set_message(reason.message());
        self.render();
        info!(
            %reason,
            score = self.state.score,
            stage = self.state.stage,
            eaten = self.state.eaten_count,
            "Game over"
        );
        if let Some(hook) = self.on_game_over.as_mut() {
            hook(reason);
        }
    }

    /// The target characters as shown in the HUD
    fn current_target_label(&self) -> String {
        if self.state.active_target_chars.is_empty() {
            consts::TARGET_SEQUENCE
                .get(self.state.current_target_index)
                .unwrap_or(&consts::TARGET_SEQUENCE[0])
                .to_string()
        } else {
            join_chars(&self.state.active_target_chars)
        }
    }

    /// The hazard characters as shown in the HUD
    fn current_avoid_label(&self) -> String {
        if self.state.active_hazard_chars.is_empty() {
            String::from("-")
        } else {
            join_chars(&self.state.active_hazard_chars)
        }
    }

    fn progress_message(&self) -> String {
        format!(
            "Stage {} | Corrupt [{}] ({}/{}). Avoid [{}].",
            self.state.stage,
            self.current_target_label(),
            self.state.eaten_this_target,
            self.state.target_quota,
            self.current_avoid_label(),
        )
    }

    fn compute_board_size(&self) -> Size {
        self.renderer
            .measure_board_size()
            .filter(|sz| sz.width / 2 >= consts::INITIAL_SNAKE_LENGTH && sz.height > 0)
            .unwrap_or(consts::DEFAULT_GRID)
    }

    fn rebuild_board(&mut self) {
        let text = self.source.next_source(self.board_size);
        extract_source_path(&text).clone_into(&mut self.source_path);
        self.grid = CodeGrid::build(&text, self.board_size);
        self.styles = StyleGrid::build(&self.grid, &consts::KEYWORDS);
        debug!(source = %self.source_path, "Built board");
    }

    /// Restart the tick timer with a period derived from the current speed
    fn update_loop_speed(&mut self) {
        self.timer = Some(TickTimer::start(
            tick_delay(self.state.speed),
            Instant::now(),
        ));
    }

    fn sync_hud(&mut self) {
        let hud = Hud {
            score: self.state.score,
            stage: self.state.stage,
            target_label: self.current_target_label(),
            avoid_label: self.current_avoid_label(),
            eaten: self.state.eaten_count,
            speed: self.state.speed,
            audio_enabled: self.audio.is_enabled(),
        };
        self.renderer.update_status(&hud);
    }

    fn render(&mut self) {
        let view = BoardView {
            grid: &self.grid,
            styles: &self.styles,
            source_path: &self.source_path,
            eaten: &self.state.eaten,
            corrupted_chars: &self.state.corrupted_chars,
            active_targets: &self.state.active_targets,
            hazard_cells: &self.state.hazard_cells,
            remote_players: &self.remote_players,
            snake: &self.state.snake,
            game_over: self.state.game_over,
            won: self.state.won,
        };
        self.renderer.render_board(&view);
    }
}

impl<V: fmt::Debug, A: fmt::Debug, S: fmt::Debug, R: fmt::Debug> fmt::Debug
    for GameEngine<V, A, S, R>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameEngine")
            .field("renderer", &self.renderer)
            .field("audio", &self.audio)
            .field("source", &self.source)
            .field("rng", &self.rng)
            .field("source_path", &self.source_path)
            .field("board_size", &self.board_size)
            .field("remote_players", &self.remote_players)
            .field("state", &self.state)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

fn join_chars(chars: &[char]) -> String {
    let mut s = String::with_capacity(chars.len() * 2);
    for (i, &ch) in chars.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        s.push(ch);
    }
    s
}
