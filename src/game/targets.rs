use super::{EndReason, GameEngine};
use crate::audio::AudioEngine;
use crate::consts::{targets, TARGET_SEQUENCE};
use crate::grid::shuffled;
use crate::render::Renderer;
use crate::source::SourceProvider;
use rand::Rng;
use ratatui::layout::Position;
use std::collections::HashSet;
use tracing::debug;

/// A target character chosen for the next round along with its unconsumed
/// cells
#[derive(Clone, Debug, Eq, PartialEq)]
struct Selection {
    /// Index of the character in [`TARGET_SEQUENCE`]
    index: usize,
    ch: char,
    pool: Vec<Position>,
}

impl<V: Renderer, A: AudioEngine, S: SourceProvider, R: Rng> GameEngine<V, A, S, R> {
    /// Choose the next set of target characters & cells, starting from the
    /// rolling cursor into [`TARGET_SEQUENCE`].  If no character in the
    /// sequence has an unconsumed cell left on the board, the run is won and
    /// `false` is returned.
    pub(super) fn pick_next_targets(&mut self) -> bool {
        let char_count = targets::MAX_CHARS.min(
            targets::MIN_CHARS
                .saturating_add(to_usize(self.state.eaten_count / targets::CHAR_GROWTH_STEP)),
        );
        let mut selected = Vec::with_capacity(char_count);
        for offset in 0..TARGET_SEQUENCE.len() {
            if selected.len() >= char_count {
                break;
            }
            let index = (self.state.current_target_index + offset) % TARGET_SEQUENCE.len();
            let ch = TARGET_SEQUENCE[index];
            let pool = self.grid.find_candidates(ch, &self.state.eaten);
            if !pool.is_empty() {
                selected.push(Selection { index, ch, pool });
            }
        }

        let Some(last_index) = selected.last().map(|sel| sel.index) else {
            debug!("No target characters left on board");
            self.end_game(EndReason::Win);
            return false;
        };

        let per_char_cap = targets::PER_CHAR_MAX.min(
            targets::PER_CHAR_BASE
                .saturating_add(to_usize(self.state.score / targets::PER_CHAR_SCORE_STEP)),
        );
        let mut cells = HashSet::new();
        for sel in &selected {
            cells.extend(
                shuffled(&sel.pool, &mut self.rng)
                    .into_iter()
                    .take(per_char_cap),
            );
        }

        self.state.active_target_chars = selected.iter().map(|sel| sel.ch).collect();
        self.state.current_target_index = (last_index + 1) % TARGET_SEQUENCE.len();
        self.state.active_targets = cells;
        self.state.eaten_this_target = 0;
        self.state.target_quota = targets::MAX_QUOTA.min(
            targets::BASE_QUOTA.saturating_add(self.state.score / targets::QUOTA_SCORE_STEP),
        );
        debug!(
            chars = ?self.state.active_target_chars,
            cells = self.state.active_targets.len(),
            quota = self.state.target_quota,
            "Picked new targets"
        );
        true
    }
}

pub(super) fn to_usize(n: u32) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}
