use crate::audio::AudioEngine;
use crate::command::Command;
use crate::game::{EndReason, GameEngine};
use crate::logo::Intro;
use crate::net::{DirBackend, MultiplayerSession};
use crate::render::TerminalRenderer;
use crate::source::SourceTextProvider;
use crossterm::event::{self, Event};
use rand::Rng;
use ratatui::{backend::Backend, layout::Size, Frame, Terminal};
use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::warn;

/// How long to wait for input when no tick is due sooner
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Minimum time between refreshes of the room roster
const ROSTER_POLL: Duration = Duration::from_millis(250);

pub(crate) type Engine<A, R> = GameEngine<TerminalRenderer, A, SourceTextProvider<R>, R>;

/// A room to join, under the given name, whenever a run starts
#[derive(Debug)]
pub(crate) struct Multiplayer {
    pub(crate) session: MultiplayerSession<DirBackend>,
    pub(crate) name: String,
}

#[derive(Debug)]
pub(crate) struct App<A, R> {
    engine: Engine<A, R>,
    multiplayer: Option<Multiplayer>,
    /// Set by the engine when a run ends; taken after each step
    ended: Rc<Cell<Option<EndReason>>>,
    /// Whether the intro pop-up is still shown
    intro: bool,
    last_roster_poll: Option<Instant>,
    quitting: bool,
}

impl<A: AudioEngine, R: Rng> App<A, R> {
    pub(crate) fn new(mut engine: Engine<A, R>, multiplayer: Option<Multiplayer>) -> Self {
        let ended = Rc::new(Cell::new(None));
        let sink = Rc::clone(&ended);
        engine.set_on_game_over(move |reason| sink.set(Some(reason)));
        App {
            engine,
            multiplayer,
            ended,
            intro: true,
            last_roster_poll: None,
            quitting: false,
        }
    }

    pub(crate) fn run<B: Backend>(mut self, mut terminal: Terminal<B>) -> io::Result<()> {
        let size = terminal.size()?;
        self.engine.renderer_mut().set_terminal_size(size);
        self.engine.reset();
        while !self.quitting {
            terminal.draw(|frame| self.draw(frame))?;
            let timeout = self.engine.next_deadline().map_or(IDLE_POLL, |deadline| {
                deadline
                    .saturating_duration_since(Instant::now())
                    .min(IDLE_POLL)
            });
            if event::poll(timeout)? {
                self.handle_event(&event::read()?);
            }
            if self.engine.poll_timer(Instant::now()) {
                self.after_step();
            }
            self.sync_roster(Instant::now());
        }
        self.shutdown();
        Ok(())
    }

    fn draw(&self, frame: &mut Frame<'_>) {
        frame.render_widget(self.engine.renderer(), frame.area());
        if self.intro {
            frame.render_widget(Intro, frame.area());
        }
    }

    fn handle_event(&mut self, event: &Event) {
        if let Some(cmd) = event.as_key_press_event().and_then(Command::from_key_event) {
            self.handle_command(cmd);
        } else if let Event::Resize(width, height) = *event {
            self.engine
                .renderer_mut()
                .set_terminal_size(Size::new(width, height));
            let state = self.engine.state();
            if !state.running && !state.game_over {
                self.engine.reset();
            }
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Quit => self.quitting = true,
            Command::Turn(d) => self.engine.set_direction(d),
            Command::Start => {
                if self.engine.state().running {
                    return;
                }
                self.intro = false;
                self.join_room();
                self.engine.start();
                self.after_step();
            }
            Command::ToggleAudio => self.engine.toggle_audio(),
        }
    }

    fn join_room(&mut self) {
        let Some(mp) = self.multiplayer.as_mut() else {
            return;
        };
        if mp.session.is_joined() {
            return;
        }
        match mp.session.join(&mp.name) {
            Ok(_) => {
                self.last_roster_poll = Some(Instant::now());
                self.engine
                    .set_remote_players(mp.session.remote_snake_players());
            }
            Err(e) => warn!(error = %e, "Failed to join multiplayer room; playing alone"),
        }
    }

    /// Share the engine's latest state and react to the end of a run
    fn after_step(&mut self) {
        if let Some(mp) = self.multiplayer.as_mut() {
            mp.session.push_state(&self.engine.snapshot());
        }
        if self.ended.take() == Some(EndReason::Player) {
            if let Some(mp) = self.multiplayer.as_mut() {
                mp.session.leave(EndReason::Player.as_str());
            }
            self.engine.set_remote_players(Vec::new());
        }
    }

    fn sync_roster(&mut self, now: Instant) {
        let Some(mp) = self.multiplayer.as_mut() else {
            return;
        };
        if !mp.session.is_joined()
            || self
                .last_roster_poll
                .is_some_and(|t| now.saturating_duration_since(t) < ROSTER_POLL)
        {
            return;
        }
        self.last_roster_poll = Some(now);
        if let Err(e) = mp.session.poll() {
            warn!(error = %e, "Failed to refresh room roster");
            return;
        }
        self.engine
            .set_remote_players(mp.session.remote_snake_players());
    }

    fn shutdown(&mut self) {
        if let Some(mp) = self.multiplayer.as_mut() {
            mp.session.leave("left");
        }
        self.engine.dispose();
    }
}
