//! Sound feedback
use std::io::Write;
use std::time::{Duration, Instant};

/// Sound cues & the audio on/off switch.  None of these methods block; any
/// failure to produce sound is swallowed by the implementation.
pub(crate) trait AudioEngine {
    fn is_enabled(&self) -> bool;

    /// Turn audio on at the start of a run, if the implementation allows
    /// that without an explicit toggle
    fn ensure_enabled_for_gameplay(&mut self);

    fn toggle(&mut self);

    /// Inform the engine whether a run is in progress
    fn set_playback_active(&mut self, active: bool);

    fn set_game_speed(&mut self, multiplier: f64);

    fn play_start_sfx(&mut self);

    fn play_eat_sfx(&mut self);

    fn play_crash_sfx(&mut self);

    fn dispose(&mut self);
}

impl<T: AudioEngine + ?Sized> AudioEngine for Box<T> {
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn ensure_enabled_for_gameplay(&mut self) {
        (**self).ensure_enabled_for_gameplay();
    }

    fn toggle(&mut self) {
        (**self).toggle();
    }

    fn set_playback_active(&mut self, active: bool) {
        (**self).set_playback_active(active);
    }

    fn set_game_speed(&mut self, multiplier: f64) {
        (**self).set_game_speed(multiplier);
    }

    fn play_start_sfx(&mut self) {
        (**self).play_start_sfx();
    }

    fn play_eat_sfx(&mut self) {
        (**self).play_eat_sfx();
    }

    fn play_crash_sfx(&mut self) {
        (**self).play_crash_sfx();
    }

    fn dispose(&mut self) {
        (**self).dispose();
    }
}

/// An [`AudioEngine`] that makes no sound and is never enabled
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct SilentAudio;

impl AudioEngine for SilentAudio {
    fn is_enabled(&self) -> bool {
        false
    }

    fn ensure_enabled_for_gameplay(&mut self) {}

    fn toggle(&mut self) {}

    fn set_playback_active(&mut self, _active: bool) {}

    fn set_game_speed(&mut self, _multiplier: f64) {}

    fn play_start_sfx(&mut self) {}

    fn play_eat_sfx(&mut self) {}

    fn play_crash_sfx(&mut self) {}

    fn dispose(&mut self) {}
}

/// Shortest gap between two "eat" bells at speed 1.0
const EAT_BELL_GAP: Duration = Duration::from_millis(260);

/// Shortest gap between two "eat" bells at any speed
const MIN_EAT_BELL_GAP: Duration = Duration::from_millis(100);

/// An [`AudioEngine`] that rings the terminal bell
#[derive(Debug)]
pub(crate) struct TerminalAudio<W> {
    out: W,
    enabled: bool,
    /// Whether starting a run turns the bell on by itself
    auto_enable: bool,
    playback_active: bool,
    speed: f64,
    last_eat_bell: Option<Instant>,
}

impl<W: Write> TerminalAudio<W> {
    pub(crate) fn new(out: W, auto_enable: bool) -> TerminalAudio<W> {
        TerminalAudio {
            out,
            enabled: false,
            auto_enable,
            playback_active: false,
            speed: 1.0,
            last_eat_bell: None,
        }
    }

    fn ring(&mut self) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.out.write_all(b"\x07").and_then(|()| self.out.flush()) {
            tracing::debug!(error = %e, "Failed to ring terminal bell");
        }
    }

    fn eat_bell_gap(&self) -> Duration {
        EAT_BELL_GAP
            .div_f64(self.speed.max(1.0))
            .max(MIN_EAT_BELL_GAP)
    }

    fn enable(&mut self, with_chime: bool) {
        self.enabled = true;
        tracing::debug!(playback_active = self.playback_active, "Audio enabled");
        if with_chime {
            self.play_start_sfx();
        }
    }

    fn disable(&mut self) {
        if self.enabled {
            tracing::debug!("Audio disabled");
        }
        self.enabled = false;
    }
}

impl<W: Write> AudioEngine for TerminalAudio<W> {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn ensure_enabled_for_gameplay(&mut self) {
        if !self.enabled && self.auto_enable {
            self.enable(false);
        }
    }

    fn toggle(&mut self) {
        if self.enabled {
            self.disable();
        } else {
            self.enable(true);
        }
    }

    fn set_playback_active(&mut self, active: bool) {
        self.playback_active = active;
    }

    fn set_game_speed(&mut self, multiplier: f64) {
        self.speed = if multiplier.is_finite() {
            multiplier.max(1.0)
        } else {
            1.0
        };
    }

    fn play_start_sfx(&mut self) {
        self.ring();
    }

    fn play_eat_sfx(&mut self) {
        let now = Instant::now();
        if self
            .last_eat_bell
            .is_some_and(|t| now.saturating_duration_since(t) < self.eat_bell_gap())
        {
            return;
        }
        if self.enabled {
            self.last_eat_bell = Some(now);
        }
        self.ring();
    }

    fn play_crash_sfx(&mut self) {
        self.ring();
    }

    fn dispose(&mut self) {
        self.playback_active = false;
        self.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bells(audio: &TerminalAudio<Vec<u8>>) -> usize {
        audio.out.iter().filter(|&&b| b == 7).count()
    }

    #[test]
    fn silent_until_enabled() {
        let mut audio = TerminalAudio::new(Vec::new(), false);
        assert!(!audio.is_enabled());
        audio.play_start_sfx();
        audio.play_crash_sfx();
        assert_eq!(bells(&audio), 0);
        audio.ensure_enabled_for_gameplay();
        assert!(!audio.is_enabled());
    }

    #[test]
    fn gameplay_auto_enable() {
        let mut audio = TerminalAudio::new(Vec::new(), true);
        audio.ensure_enabled_for_gameplay();
        assert!(audio.is_enabled());
        assert_eq!(bells(&audio), 0);
        audio.play_crash_sfx();
        assert_eq!(bells(&audio), 1);
    }

    #[test]
    fn toggle_chimes_when_switched_on() {
        let mut audio = TerminalAudio::new(Vec::new(), false);
        audio.toggle();
        assert!(audio.is_enabled());
        assert_eq!(bells(&audio), 1);
        audio.toggle();
        assert!(!audio.is_enabled());
        assert_eq!(bells(&audio), 1);
    }

    #[test]
    fn eat_bells_are_throttled() {
        let mut audio = TerminalAudio::new(Vec::new(), true);
        audio.ensure_enabled_for_gameplay();
        audio.play_eat_sfx();
        audio.play_eat_sfx();
        audio.play_eat_sfx();
        assert_eq!(bells(&audio), 1);
    }

    #[test]
    fn speed_shortens_bell_gap() {
        let mut audio = TerminalAudio::new(Vec::new(), false);
        assert_eq!(audio.eat_bell_gap(), Duration::from_millis(260));
        audio.set_game_speed(2.0);
        assert_eq!(audio.eat_bell_gap(), Duration::from_millis(130));
        audio.set_game_speed(100.0);
        assert_eq!(audio.eat_bell_gap(), MIN_EAT_BELL_GAP);
        audio.set_game_speed(f64::NAN);
        assert_eq!(audio.eat_bell_gap(), Duration::from_millis(260));
    }

    #[test]
    fn dispose_disables() {
        let mut audio = TerminalAudio::new(Vec::new(), true);
        audio.ensure_enabled_for_gameplay();
        audio.set_playback_active(true);
        audio.dispose();
        assert!(!audio.is_enabled());
        assert!(!audio.playback_active);
        audio.play_start_sfx();
        assert_eq!(bells(&audio), 0);
    }
}
