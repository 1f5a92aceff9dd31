//! Cosmetic syntax classification of board cells
use crate::grid::CodeGrid;

/// Display class of a single board cell
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub(crate) enum Token {
    #[default]
    Plain,
    Keyword,
    Str,
    Number,
    Comment,
    Punct,
    Function,
}

const PUNCTUATION: &str = "{}[]();,.<>:+-*/=%!?&|";

/// A matrix of [`Token`]s parallel to a [`CodeGrid`]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct StyleGrid(Vec<Vec<Token>>);

impl StyleGrid {
    /// Classify every cell of `grid`, treating identifiers in `keywords` as
    /// keywords.  Each row is scanned independently.
    pub(crate) fn build(grid: &CodeGrid, keywords: &[&str]) -> StyleGrid {
        StyleGrid(
            grid.rows()
                .map(|line| classify_line(line, keywords))
                .collect(),
        )
    }

    pub(crate) fn get(&self, x: usize, y: usize) -> Token {
        self.0
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or_default()
    }
}

fn classify_line(line: &[char], keywords: &[&str]) -> Vec<Token> {
    let width = line.len();
    let mut styles = vec![Token::Plain; width];
    let mut i = 0;
    while i < width {
        let ch = line[i];
        if ch == '/' && line.get(i + 1) == Some(&'/') {
            styles[i..].fill(Token::Comment);
            break;
        } else if matches!(ch, '\'' | '"' | '`') {
            let mut j = i + 1;
            while j < width {
                if line[j] == '\\' && j + 1 < width {
                    j += 2;
                } else if line[j] == ch {
                    j += 1;
                    break;
                } else {
                    j += 1;
                }
            }
            styles[i..j].fill(Token::Str);
            i = j;
        } else if ch.is_ascii_digit() {
            let j = scan(line, i + 1, |c| c.is_ascii_digit() || c == '_' || c == '.');
            styles[i..j].fill(Token::Number);
            i = j;
        } else if is_ident_start(ch) {
            let j = scan(line, i + 1, |c| is_ident_start(c) || c.is_ascii_digit());
            let word = line[i..j].iter().collect::<String>();
            if keywords.contains(&word.as_str()) {
                styles[i..j].fill(Token::Keyword);
            } else {
                let lookahead = scan(line, j, char::is_whitespace);
                if line.get(lookahead) == Some(&'(') {
                    styles[i..j].fill(Token::Function);
                }
            }
            i = j;
        } else {
            if PUNCTUATION.contains(ch) {
                styles[i] = Token::Punct;
            }
            i += 1;
        }
    }
    styles
}

/// Return the index of the first character at or after `start` that does not
/// satisfy `pred`
fn scan<P: Fn(char) -> bool>(line: &[char], start: usize, pred: P) -> usize {
    line.iter()
        .skip(start)
        .position(|&c| !pred(c))
        .map_or(line.len().max(start), |k| start + k)
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}
