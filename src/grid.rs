//! The character board the virus crawls over
use rand::{seq::SliceRandom, Rng};
use ratatui::layout::{Position, Positions, Rect, Size};
use std::collections::HashSet;

/// A dense `height × width` matrix of characters built from a block of
/// source text.  Cells are addressed by [`Position`], which is also the key
/// type used for every set of cells in the game.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct CodeGrid {
    size: Size,
    cells: Vec<char>,
}

impl CodeGrid {
    /// Lay `text` out on a grid of the given size.  Only the first
    /// `size.height` lines are used; each line is truncated or space-padded to
    /// exactly `size.width` characters, and rows beyond the end of the text are
    /// all spaces.
    pub(crate) fn build(text: &str, size: Size) -> CodeGrid {
        let width = usize::from(size.width);
        let height = usize::from(size.height);
        let mut cells = Vec::with_capacity(width * height);
        let mut lines = text.split('\n');
        for _ in 0..height {
            let line = lines.next().unwrap_or_default();
            let before = cells.len();
            cells.extend(line.chars().take(width));
            cells.resize(before + width, ' ');
        }
        CodeGrid { size, cells }
    }

    pub(crate) fn size(&self) -> Size {
        self.size
    }

    /// Return the character at `pos`, or `None` if `pos` is off the board
    pub(crate) fn get(&self, pos: Position) -> Option<char> {
        in_bounds(pos, self.size).then(|| self.cells[self.index(pos)])
    }

    /// Iterate over the rows of the grid, top to bottom
    pub(crate) fn rows(&self) -> impl Iterator<Item = &[char]> + '_ {
        // `chunks` panics on zero; a zero-width grid simply has no rows.
        self.cells.chunks(usize::from(self.size.width).max(1))
    }

    /// Iterate over all positions on the board in row-major order
    pub(crate) fn positions(&self) -> Positions {
        // A zero-width `Rect` still yields one position per row.
        let area = if self.size.width == 0 || self.size.height == 0 {
            Rect::default()
        } else {
            Rect::from((Position::ORIGIN, self.size))
        };
        area.positions()
    }

    /// Return every cell holding `ch` that is not in `exclude`, in row-major
    /// order.
    pub(crate) fn find_candidates(&self, ch: char, exclude: &HashSet<Position>) -> Vec<Position> {
        self.positions()
            .filter(|pos| self.get(*pos) == Some(ch) && !exclude.contains(pos))
            .collect()
    }

    fn index(&self, pos: Position) -> usize {
        usize::from(pos.y) * usize::from(self.size.width) + usize::from(pos.x)
    }
}

/// Half-open bounds check on both axes
pub(crate) fn in_bounds(pos: Position, size: Size) -> bool {
    pos.x < size.width && pos.y < size.height
}

/// Return a uniformly shuffled copy of `values`, leaving the input untouched
pub(crate) fn shuffled<T: Clone, R: Rng + ?Sized>(values: &[T], rng: &mut R) -> Vec<T> {
    let mut copy = values.to_vec();
    copy.shuffle(rng);
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;
    use rstest::rstest;

    fn row(grid: &CodeGrid, y: usize) -> String {
        grid.rows().nth(y).unwrap_or_default().iter().collect()
    }

    #[test]
    fn build_pads_and_truncates() {
        let grid = CodeGrid::build("abc\nlonger-than-width\n", Size::new(5, 3));
        assert_eq!(grid.size(), Size::new(5, 3));
        assert_eq!(row(&grid, 0), "abc  ");
        assert_eq!(row(&grid, 1), "longe");
        assert_eq!(row(&grid, 2), "     ");
    }

    #[test]
    fn build_ignores_lines_beyond_height() {
        let grid = CodeGrid::build("1\n2\n3\n4", Size::new(2, 2));
        assert_eq!(grid.rows().count(), 2);
        assert_eq!(row(&grid, 1), "2 ");
    }

    #[test]
    fn build_reads_back_source_or_padding() {
        let text = "fn main() {\n    42\n}";
        let size = Size::new(8, 4);
        let grid = CodeGrid::build(text, size);
        let lines = text.split('\n').collect::<Vec<_>>();
        let rows = grid.rows().collect::<Vec<_>>();
        for pos in grid.positions() {
            let expected = lines
                .get(usize::from(pos.y))
                .and_then(|ln| ln.chars().nth(usize::from(pos.x)))
                .unwrap_or(' ');
            assert_eq!(
                rows[usize::from(pos.y)][usize::from(pos.x)],
                expected,
                "mismatch at {pos:?}"
            );
        }
        assert_eq!(grid, CodeGrid::build(text, size));
    }

    #[test]
    fn build_counts_characters_not_bytes() {
        let grid = CodeGrid::build("é→x", Size::new(4, 1));
        assert_eq!(row(&grid, 0), "é→x ");
    }

    #[test]
    fn zero_width_grid_has_no_rows() {
        let grid = CodeGrid::build("ab", Size::new(0, 3));
        assert!(grid.rows().all(<[char]>::is_empty));
        assert_eq!(grid.positions().count(), 0);
        assert!(grid.find_candidates('a', &HashSet::new()).is_empty());
    }

    #[test]
    fn get_out_of_bounds() {
        let grid = CodeGrid::build("ab", Size::new(2, 1));
        assert_eq!(grid.get(Position::new(1, 0)), Some('b'));
        assert_eq!(grid.get(Position::new(2, 0)), None);
        assert_eq!(grid.get(Position::new(0, 1)), None);
    }

    #[rstest]
    #[case(Position::new(0, 0), true)]
    #[case(Position::new(2, 2), true)]
    #[case(Position::new(0, 3), false)]
    #[case(Position::new(3, 0), false)]
    fn test_in_bounds(#[case] pos: Position, #[case] r: bool) {
        assert_eq!(in_bounds(pos, Size::new(3, 3)), r);
    }

    #[test]
    fn shuffled_keeps_input_intact() {
        let mut rng = ChaCha12Rng::seed_from_u64(0x0123456789ABCDEF);
        let input = vec!['a', 'b', 'c', 'd', 'e'];
        let mut result = shuffled(&input, &mut rng);
        assert_eq!(input, ['a', 'b', 'c', 'd', 'e']);
        result.sort_unstable();
        assert_eq!(result, input);
    }

    #[test]
    fn find_candidates_skips_excluded() {
        let grid = CodeGrid::build("{x{\n}{y", Size::new(3, 2));
        let eaten = HashSet::from([Position::new(2, 0)]);
        assert_eq!(
            grid.find_candidates('{', &eaten),
            [Position::new(0, 0), Position::new(1, 1)]
        );
        assert_eq!(grid.find_candidates('}', &eaten), [Position::new(0, 1)]);
        assert!(grid.find_candidates('q', &eaten).is_empty());
    }
}
