use super::targets::to_usize;
use super::GameEngine;
use crate::audio::AudioEngine;
use crate::consts::{hazards, HAZARD_SEQUENCE};
use crate::grid::in_bounds;
use crate::render::Renderer;
use crate::source::SourceProvider;
use rand::{seq::SliceRandom, Rng};
use ratatui::layout::Position;
use std::collections::{HashSet, VecDeque};
use tracing::trace;

/// Return how many hazard cells should be on the board after `eaten_count`
/// cells have been consumed
pub(super) fn desired_hazard_count(eaten_count: u32) -> usize {
    if eaten_count < hazards::UNLOCK_AT_EATEN {
        return 0;
    }
    let steps = to_usize((eaten_count - hazards::UNLOCK_AT_EATEN) / hazards::GROWTH_STEP);
    hazards::BASE_COUNT
        .saturating_add(steps.saturating_mul(hazards::GROWTH_PER_STEP))
        .min(hazards::MAX_COUNT)
}

impl<V: Renderer, A: AudioEngine, S: SourceProvider, R: Rng> GameEngine<V, A, S, R> {
    /// Bring the set of hazard cells up to date with the current progress.
    ///
    /// Existing hazards that are still valid are kept unless `force` is true.
    /// New hazards are then drawn round-robin from one shuffled pool per
    /// hazard character, skipping eaten cells, targets & the snake, until the
    /// desired count is reached or the pools run dry.
    pub(super) fn refresh_hazards(&mut self, force: bool) {
        let desired = desired_hazard_count(self.state.eaten_count);
        if desired == 0 {
            self.state.hazard_cells.clear();
            self.state.active_hazard_chars.clear();
            return;
        }
        if force {
            self.state.hazard_cells.clear();
        }

        let snake = self.state.snake.iter().copied().collect::<HashSet<_>>();
        let mut chars = Vec::new();
        let mut pools = VecDeque::new();
        for ch in HAZARD_SEQUENCE {
            let mut pool = self
                .grid
                .find_candidates(ch, &self.state.eaten)
                .into_iter()
                .filter(|pos| !self.state.active_targets.contains(pos) && !snake.contains(pos))
                .collect::<Vec<Position>>();
            if !pool.is_empty() {
                pool.shuffle(&mut self.rng);
                chars.push(ch);
                pools.push_back(pool);
            }
        }
        chars.truncate(hazards::LABEL_CHARS);
        self.state.active_hazard_chars = chars;

        let size = self.board_size;
        let targets = &self.state.active_targets;
        let eaten = &self.state.eaten;
        self.state.hazard_cells.retain(|pos| {
            !targets.contains(pos)
                && !eaten.contains(pos)
                && !snake.contains(pos)
                && in_bounds(*pos, size)
        });

        while self.state.hazard_cells.len() < desired {
            let Some(mut pool) = pools.pop_front() else {
                break;
            };
            if let Some(pos) = pool.pop() {
                self.state.hazard_cells.insert(pos);
            }
            if !pool.is_empty() {
                pools.push_back(pool);
            }
        }
        trace!(
            desired,
            placed = self.state.hazard_cells.len(),
            force,
            "Refreshed hazards"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0)]
    #[case(7, 0)]
    #[case(8, 4)]
    #[case(13, 4)]
    #[case(14, 7)]
    #[case(20, 10)]
    #[case(200, 100)]
    fn test_desired_hazard_count(#[case] eaten: u32, #[case] count: usize) {
        assert_eq!(desired_hazard_count(eaten), count);
    }
}
