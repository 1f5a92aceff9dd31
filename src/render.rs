//! Drawing the board, HUD & messages
use crate::consts;
use crate::game::RemotePlayer;
use crate::grid::CodeGrid;
use crate::highlight::{StyleGrid, Token};
use crate::util::center_rect;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Margin, Position, Rect, Size},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

/// The surface the engine draws on
pub(crate) trait Renderer {
    /// Report the board size that would fit the display, if known
    fn measure_board_size(&self) -> Option<Size> {
        None
    }

    fn update_status(&mut self, hud: &Hud);

    fn set_message(&mut self, text: &str);

    /// Draw the board.  The view is only valid for the duration of the call.
    fn render_board(&mut self, view: &BoardView<'_>);

    /// Briefly flash the display
    fn trigger_glitch(&mut self);
}

/// HUD fields pushed to the renderer
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Hud {
    pub(crate) score: u32,
    pub(crate) stage: u32,
    pub(crate) target_label: String,
    pub(crate) avoid_label: String,
    pub(crate) eaten: u32,
    pub(crate) speed: f64,
    pub(crate) audio_enabled: bool,
}

/// A borrowed, read-only view of everything needed to draw the board
#[derive(Clone, Copy, Debug)]
pub(crate) struct BoardView<'a> {
    pub(crate) grid: &'a CodeGrid,
    pub(crate) styles: &'a StyleGrid,
    pub(crate) source_path: &'a str,
    pub(crate) eaten: &'a HashSet<Position>,
    pub(crate) corrupted_chars: &'a HashMap<Position, char>,
    pub(crate) active_targets: &'a HashSet<Position>,
    pub(crate) hazard_cells: &'a HashSet<Position>,
    pub(crate) remote_players: &'a [RemotePlayer],
    pub(crate) snake: &'a VecDeque<Position>,
    pub(crate) game_over: bool,
    pub(crate) won: bool,
}

/// Styles used for drawing the board
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Theme {
    pub(crate) plain: Style,
    pub(crate) keyword: Style,
    pub(crate) string: Style,
    pub(crate) number: Style,
    pub(crate) comment: Style,
    pub(crate) punct: Style,
    pub(crate) function: Style,
    pub(crate) target: Style,
    pub(crate) hazard: Style,
    pub(crate) corrupted: Style,
    pub(crate) snake: Style,
    pub(crate) remote: Style,
}

impl Theme {
    pub(crate) fn token_style(&self, token: Token) -> Style {
        match token {
            Token::Plain => self.plain,
            Token::Keyword => self.keyword,
            Token::Str => self.string,
            Token::Number => self.number,
            Token::Comment => self.comment,
            Token::Punct => self.punct,
            Token::Function => self.function,
        }
    }
}

impl Default for Theme {
    fn default() -> Theme {
        Theme {
            plain: Style::new(),
            keyword: Style::new().fg(Color::LightBlue),
            string: Style::new().fg(Color::LightYellow),
            number: Style::new().fg(Color::LightGreen),
            comment: Style::new().fg(Color::DarkGray),
            punct: Style::new().fg(Color::Gray),
            function: Style::new().fg(Color::LightCyan),
            target: Style::new()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            hazard: Style::new().fg(Color::White).bg(Color::Red),
            corrupted: Style::new().fg(Color::Magenta),
            snake: Style::new().fg(Color::Black).bg(Color::Green),
            remote: Style::new().fg(Color::Black).bg(Color::Cyan),
        }
    }
}

/// A [`Renderer`] that keeps the latest HUD, message & board as owned data
/// and draws them as a ratatui widget
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TerminalRenderer {
    theme: Theme,
    /// Board size fixed by configuration, overriding measurement
    fixed_size: Option<Size>,
    /// Size of the whole terminal, as of the last resize
    terminal_size: Size,
    hud: Option<Hud>,
    message: String,
    board: BoardFrame,
    glitch_until: Option<Instant>,
}

impl TerminalRenderer {
    pub(crate) fn new(theme: Theme, fixed_size: Option<Size>) -> TerminalRenderer {
        TerminalRenderer {
            theme,
            fixed_size,
            terminal_size: Size::ZERO,
            hud: None,
            message: String::new(),
            board: BoardFrame::default(),
            glitch_until: None,
        }
    }

    pub(crate) fn set_terminal_size(&mut self, size: Size) {
        self.terminal_size = size;
    }

    fn glitching(&self) -> bool {
        self.glitch_until.is_some_and(|t| Instant::now() < t)
    }
}

impl Renderer for TerminalRenderer {
    fn measure_board_size(&self) -> Option<Size> {
        if self.fixed_size.is_some() {
            return self.fixed_size;
        }
        if self.terminal_size.width == 0 || self.terminal_size.height == 0 {
            return None;
        }
        // HUD line + message line + top & bottom border
        let height = self.terminal_size.height.saturating_sub(4);
        // left & right border + gutter
        let width = self
            .terminal_size
            .width
            .saturating_sub(2 + consts::GUTTER_WIDTH);
        Some(Size {
            width: width.max(consts::MIN_MEASURED_GRID.width),
            height: height.max(consts::MIN_MEASURED_GRID.height),
        })
    }

    fn update_status(&mut self, hud: &Hud) {
        self.hud = Some(hud.clone());
    }

    fn set_message(&mut self, text: &str) {
        text.clone_into(&mut self.message);
    }

    fn render_board(&mut self, view: &BoardView<'_>) {
        self.board = BoardFrame::compose(view, &self.theme);
    }

    fn trigger_glitch(&mut self) {
        self.glitch_until = Some(Instant::now() + consts::GLITCH_DURATION);
    }
}

/// An owned matrix of styled cells produced from a [`BoardView`]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct BoardFrame {
    source_path: String,
    size: Size,
    rows: Vec<Vec<(char, Style)>>,
    /// One label per other player in the room
    players: Vec<String>,
}

impl BoardFrame {
    fn compose(view: &BoardView<'_>, theme: &Theme) -> BoardFrame {
        let snake = view.snake.iter().copied().collect::<HashSet<_>>();
        let head = view.snake.front().copied();
        let remote = view
            .remote_players
            .iter()
            .flat_map(|p| p.snake.iter().copied())
            .collect::<HashSet<_>>();
        let rows = view
            .grid
            .rows()
            .zip(0u16..)
            .map(|(line, y)| {
                line.iter()
                    .zip(0u16..)
                    .map(|(&ch, x)| {
                        let pos = Position::new(x, y);
                        let (mut ch, mut style) = if view.eaten.contains(&pos) {
                            (
                                view.corrupted_chars.get(&pos).copied().unwrap_or(' '),
                                theme.corrupted,
                            )
                        } else if view.active_targets.contains(&pos) {
                            (ch, theme.target)
                        } else if view.hazard_cells.contains(&pos) {
                            (ch, theme.hazard)
                        } else {
                            let token = view.styles.get(usize::from(x), usize::from(y));
                            (ch, theme.token_style(token))
                        };
                        if remote.contains(&pos) {
                            style = theme.remote;
                        }
                        if snake.contains(&pos) {
                            style = theme.snake;
                        }
                        if head == Some(pos) {
                            if view.game_over && !view.won {
                                ch = consts::COLLISION_SYMBOL;
                                style = consts::COLLISION_STYLE;
                            } else {
                                style = style.add_modifier(Modifier::BOLD);
                            }
                        }
                        (ch, style)
                    })
                    .collect()
            })
            .collect();
        let players = view
            .remote_players
            .iter()
            .map(|p| format!("{}: {} (stage {})", p.name, p.score, p.stage))
            .collect();
        BoardFrame {
            source_path: view.source_path.to_owned(),
            size: view.grid.size(),
            rows,
            players,
        }
    }
}

impl Widget for &TerminalRenderer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [hud_area, board_area, msg_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        if let Some(ref hud) = self.hud {
            Line::styled(
                format!(
                    " Score: {} | Stage: {} | Target: {} | Avoid: {} | Corrupted: {} | Speed: {:.1}x | Audio: {}",
                    hud.score,
                    hud.stage,
                    hud.target_label,
                    hud.avoid_label,
                    hud.eaten,
                    hud.speed,
                    if hud.audio_enabled { "ON" } else { "OFF" },
                ),
                consts::HUD_STYLE,
            )
            .render(hud_area, buf);
        }

        let block_size = Size {
            width: self
                .board
                .size
                .width
                .saturating_add(2 + consts::GUTTER_WIDTH),
            height: self.board.size.height.saturating_add(2),
        };
        let block_area = center_rect(board_area, block_size);
        let mut block = Block::bordered().title(format!(" {} ", self.board.source_path));
        if !self.board.players.is_empty() {
            block = block.title_bottom(format!(" {} ", self.board.players.join(" | ")));
        }
        block.render(block_area, buf);
        let inner = block_area.inner(Margin::new(1, 1));
        let glitch = self.glitching();
        for (row, y) in self.board.rows.iter().zip(inner.y..inner.bottom()) {
            let lineno = format!("{:>3} ", y - inner.y + 1);
            Span::styled(lineno, consts::GUTTER_STYLE).render(
                Rect {
                    y,
                    height: 1,
                    ..inner
                },
                buf,
            );
            let cells_x = inner.x.saturating_add(consts::GUTTER_WIDTH);
            for (&(ch, style), x) in row.iter().zip(cells_x..inner.right()) {
                if let Some(cell) = buf.cell_mut((x, y)) {
                    cell.set_char(ch);
                    let style = if glitch {
                        style.add_modifier(Modifier::REVERSED)
                    } else {
                        style
                    };
                    cell.set_style(Style::reset().patch(style));
                }
            }
        }

        Line::from(format!(" {}", self.message)).render(msg_area, buf);
    }
}
