use crate::consts::speed;
use std::time::{Duration, Instant};

/// A cancellable repeating deadline driving the engine's ticks.  The engine
/// holds one as an `Option`; changing the period means dropping the old timer
/// and starting a new one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct TickTimer {
    period: Duration,
    next: Instant,
}

impl TickTimer {
    /// Start a timer whose first deadline is one `period` after `now`
    pub(crate) fn start(period: Duration, now: Instant) -> TickTimer {
        TickTimer {
            period,
            next: now + period,
        }
    }

    pub(crate) fn period(&self) -> Duration {
        self.period
    }

    pub(crate) fn deadline(&self) -> Instant {
        self.next
    }

    /// If the deadline has passed as of `now`, schedule the next one and
    /// return `true`.  A timer that has fallen more than a period behind
    /// fires once and resumes from `now` rather than firing repeatedly to
    /// catch up.
    pub(crate) fn fire(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next += self.period;
        if self.next <= now {
            self.next = now + self.period;
        }
        true
    }
}

/// Return the tick period for the given speed multiplier:
/// `max(MIN_DELAY, floor(BASE_DELAY / speed))`
pub(crate) fn tick_delay(multiplier: f64) -> Duration {
    // The quotient is in (0, BASE_DELAY_MS] for any multiplier >= 1.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let ms = (f64::from(speed::BASE_DELAY_MS) / multiplier.max(1.0)).floor() as u32;
    Duration::from_millis(u64::from(ms.max(speed::MIN_DELAY_MS)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1.0, 180)]
    #[case(1.03, 174)]
    #[case(1.5, 120)]
    #[case(2.75, 65)]
    #[case(4.0, 60)]
    #[case(0.5, 180)]
    fn test_tick_delay(#[case] multiplier: f64, #[case] ms: u64) {
        assert_eq!(tick_delay(multiplier), Duration::from_millis(ms));
    }

    #[test]
    fn fires_once_per_period() {
        let t0 = Instant::now();
        let period = Duration::from_millis(100);
        let mut timer = TickTimer::start(period, t0);
        assert_eq!(timer.period(), period);
        assert_eq!(timer.deadline(), t0 + period);
        assert!(!timer.fire(t0 + Duration::from_millis(99)));
        assert!(timer.fire(t0 + Duration::from_millis(100)));
        assert_eq!(timer.deadline(), t0 + Duration::from_millis(200));
        assert!(!timer.fire(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn late_timer_resumes_from_now() {
        let t0 = Instant::now();
        let period = Duration::from_millis(100);
        let mut timer = TickTimer::start(period, t0);
        let late = t0 + Duration::from_millis(450);
        assert!(timer.fire(late));
        assert_eq!(timer.deadline(), late + period);
        assert!(!timer.fire(late));
    }
}
