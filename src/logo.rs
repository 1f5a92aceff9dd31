use crate::consts;
use crate::util::center_rect;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Offset, Rect, Size},
    style::Style,
    text::{Line, Span, Text},
    widgets::{
        block::{Block, Padding},
        Clear, Widget,
    },
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Logo;

impl Logo {
    const SNAKE_WIDTH: u16 = 28;
    const GAP: u16 = 1;
    const VIRUS_WIDTH: u16 = 30;
    pub(crate) const HEIGHT: u16 = 5;
    pub(crate) const WIDTH: u16 = Self::SNAKE_WIDTH + Self::GAP + Self::VIRUS_WIDTH;
}

#[rustfmt::skip]
static SNAKE: &[&str] = &[
     " ____              _        ",
     "/ ___| _ __   __ _| | _____ ",
    r"\___ \| '_ \ / _` | |/ / _ \",
     " ___) | | | | (_| |   <  __/",
    r"|____/|_| |_|\__,_|_|\_\___|",
];

#[rustfmt::skip]
static VIRUS: &[&str] = &[
     "__     __ _                   ",
    r"\ \   / /(_) _ __  _   _  ___ ",
    r" \ \ / / | || '__|| | | |/ __|",
    r"  \ V /  | || |   | |_| |\__ \",
    r"   \_/   |_||_|    \__,_||___/",
];

impl Widget for Logo {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let snake_text = Text::from_iter(SNAKE.iter().copied()).style(consts::LOGO_SNAKE_STYLE);
        snake_text.render(area, buf);
        let virus_text = Text::from_iter(VIRUS.iter().copied()).style(consts::LOGO_VIRUS_STYLE);
        let virus_area = area
            .offset(Offset {
                x: (Self::SNAKE_WIDTH + Self::GAP).into(),
                y: 0,
            })
            .intersection(area);
        virus_text.render(virus_area, buf);
    }
}

/// A pop-up shown over the board until the first run is started
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Intro;

impl Intro {
    const HELP: [(&'static str, &'static str); 4] = [
        ("Arrows / wasd / hjkl", "steer the virus"),
        ("Space / Enter", "start a run"),
        ("m", "toggle sound"),
        ("q", "quit"),
    ];

    /// Width of the key column in the help text
    const KEY_WIDTH: usize = 22;

    const WIDTH: u16 = Logo::WIDTH + 4;

    /// The logo, a blank line, the help text & the top & bottom borders
    const HEIGHT: u16 = Logo::HEIGHT + 7;
}

impl Widget for Intro {
    // `area` is the area of the entire display, not just the pop-up.
    fn render(self, area: Rect, buf: &mut Buffer) {
        let popup = center_rect(
            area,
            Size {
                width: Intro::WIDTH,
                height: Intro::HEIGHT,
            },
        );
        let block = Block::bordered()
            .title(" SNAKE VIRUS ")
            .title_alignment(Alignment::Center)
            .padding(Padding::horizontal(1))
            .style(Style::reset());
        let inner = block.inner(popup);
        Clear.render(popup, buf);
        block.render(popup, buf);
        let logo_area = Rect {
            height: Logo::HEIGHT.min(inner.height),
            ..inner
        };
        Logo.render(logo_area, buf);
        let help_rows = inner.rows().skip(usize::from(Logo::HEIGHT) + 1);
        for (&(key, what), row) in Intro::HELP.iter().zip(help_rows) {
            Line::from_iter([
                Span::styled(format!("{key:<width$}", width = Intro::KEY_WIDTH), consts::KEY_STYLE),
                Span::raw(what),
            ])
            .render(row, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_text(buf: &Buffer, y: u16) -> String {
        (buf.area.left()..buf.area.right())
            .map(|x| buf[(x, y)].symbol())
            .collect()
    }

    #[test]
    fn test_render() {
        let mut buffer = Buffer::empty(Rect::new(0, 0, 62, 7));
        Logo.render(Rect::new(1, 1, 61, 6), &mut buffer);
        let mut expected = Buffer::with_lines([
            "",
            r"  ____              _         __     __ _                     ",
            r" / ___| _ __   __ _| | _____  \ \   / /(_) _ __  _   _  ___   ",
            r" \___ \| '_ \ / _` | |/ / _ \  \ \ / / | || '__|| | | |/ __|  ",
            r"  ___) | | | | (_| |   <  __/   \ V /  | || |   | |_| |\__ \  ",
            r" |____/|_| |_|\__,_|_|\_\___|    \_/   |_||_|    \__,_||___/  ",
            "",
        ]);
        expected.set_style(Rect::new(1, 1, 29, 6), consts::LOGO_SNAKE_STYLE);
        expected.set_style(Rect::new(30, 1, 32, 6), consts::LOGO_VIRUS_STYLE);
        assert_eq!(buffer, expected);
    }

    #[test]
    fn snake_width() {
        assert!(SNAKE
            .iter()
            .all(|ln| ln.len() == usize::from(Logo::SNAKE_WIDTH)));
    }

    #[test]
    fn virus_width() {
        assert!(VIRUS
            .iter()
            .all(|ln| ln.len() == usize::from(Logo::VIRUS_WIDTH)));
    }

    #[test]
    fn height() {
        assert_eq!(SNAKE.len(), usize::from(Logo::HEIGHT));
        assert_eq!(VIRUS.len(), usize::from(Logo::HEIGHT));
    }

    #[test]
    fn intro_shows_logo_and_keys() {
        let mut buffer = Buffer::empty(Rect::new(0, 0, 67, 16));
        Intro.render(buffer.area, &mut buffer);
        assert!(row_text(&buffer, 2).contains(" SNAKE VIRUS "));
        assert!(row_text(&buffer, 3).starts_with("  │  ____ "));
        assert!(row_text(&buffer, 10)
            .starts_with("  │ Space / Enter         start a run"));
        assert!(row_text(&buffer, 12).starts_with("  │ q                     quit"));
        assert!(row_text(&buffer, 13).starts_with("  └──"));
        assert_eq!(row_text(&buffer, 1).trim(), "");
    }
}
