use std::time::{Duration, Instant};

const ONE_SECOND: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Stopped,
}

/// Returned by [`Countdown::poll`] on the tick that reaches zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Expired;

/// Whole-second countdown driven by the caller's clock.
///
/// The owner polls it from its event loop; the countdown never schedules
/// anything on its own, so a stopped or reset countdown cannot expire
/// late. Expiry is reported at most once per `start` to zero cycle.
#[derive(Clone, Debug)]
pub struct Countdown {
    duration_secs: u64,
    remaining_secs: u64,
    state: TimerState,
    next_tick_at: Option<Instant>,
}

impl Countdown {
    pub fn new(duration_secs: u64) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            state: TimerState::Idle,
            next_tick_at: None,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// No-op when already running or when there is no time left.
    pub fn start(&mut self, now: Instant) {
        if self.is_running() || self.remaining_secs == 0 {
            return;
        }
        self.state = TimerState::Running;
        self.next_tick_at = Some(now + ONE_SECOND);
    }

    pub fn stop(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Stopped;
        }
        self.next_tick_at = None;
    }

    /// Stops the countdown and refills it, leaving it idle.
    pub fn reset(&mut self, new_duration_secs: Option<u64>) {
        self.stop();
        self.remaining_secs = new_duration_secs.unwrap_or(self.duration_secs);
        self.state = TimerState::Idle;
    }

    /// Counts down one second for every whole second elapsed since the last
    /// tick. Returns `Some(Expired)` on the poll that reaches zero.
    pub fn poll(&mut self, now: Instant) -> Option<Expired> {
        if !self.is_running() {
            return None;
        }

        while let Some(tick_at) = self.next_tick_at {
            if now < tick_at {
                break;
            }

            self.remaining_secs = self.remaining_secs.saturating_sub(1);
            if self.remaining_secs == 0 {
                self.state = TimerState::Stopped;
                self.next_tick_at = None;
                return Some(Expired);
            }
            self.next_tick_at = Some(tick_at + ONE_SECOND);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn new_countdown_is_idle_and_full() {
        let timer = Countdown::new(30);
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.remaining_secs(), 30);
        assert!(!timer.is_running());
    }

    #[test]
    fn poll_before_start_does_nothing() {
        let t0 = Instant::now();
        let mut timer = Countdown::new(3);
        assert_eq!(timer.poll(t0 + secs(10)), None);
        assert_eq!(timer.remaining_secs(), 3);
    }

    #[test]
    fn counts_whole_seconds_only() {
        let t0 = Instant::now();
        let mut timer = Countdown::new(10);
        timer.start(t0);

        assert_eq!(timer.poll(t0 + Duration::from_millis(900)), None);
        assert_eq!(timer.remaining_secs(), 10);

        assert_eq!(timer.poll(t0 + Duration::from_millis(1000)), None);
        assert_eq!(timer.remaining_secs(), 9);

        assert_eq!(timer.poll(t0 + Duration::from_millis(3500)), None);
        assert_eq!(timer.remaining_secs(), 7);
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let t0 = Instant::now();
        let mut timer = Countdown::new(5);
        timer.start(t0);
        timer.start(t0 + Duration::from_millis(800));

        timer.poll(t0 + secs(1));
        assert_eq!(timer.remaining_secs(), 4);
    }

    #[test]
    fn expires_exactly_once() {
        let t0 = Instant::now();
        let mut timer = Countdown::new(1);
        timer.start(t0);

        assert_eq!(timer.poll(t0 + secs(1)), Some(Expired));
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.remaining_secs(), 0);

        timer.start(t0 + secs(2));
        assert_eq!(timer.poll(t0 + secs(5)), None);
        assert_eq!(timer.state(), TimerState::Stopped);
    }

    #[test]
    fn late_poll_still_expires_once() {
        let t0 = Instant::now();
        let mut timer = Countdown::new(3);
        timer.start(t0);
        assert_eq!(timer.poll(t0 + secs(60)), Some(Expired));
        assert_eq!(timer.poll(t0 + secs(61)), None);
    }

    #[test]
    fn stop_prevents_expiry() {
        let t0 = Instant::now();
        let mut timer = Countdown::new(2);
        timer.start(t0);
        timer.poll(t0 + secs(1));
        timer.stop();

        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.poll(t0 + secs(10)), None);
        assert_eq!(timer.remaining_secs(), 1);
    }

    #[test]
    fn stopped_timer_resumes_on_start() {
        let t0 = Instant::now();
        let mut timer = Countdown::new(2);
        timer.start(t0);
        timer.poll(t0 + secs(1));
        timer.stop();

        timer.start(t0 + secs(5));
        assert_eq!(timer.poll(t0 + secs(6)), Some(Expired));
    }

    #[test]
    fn reset_restores_configured_duration() {
        let t0 = Instant::now();
        let mut timer = Countdown::new(30);
        timer.start(t0);
        timer.poll(t0 + secs(12));

        timer.reset(None);
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.remaining_secs(), 30);
        assert_eq!(timer.poll(t0 + secs(100)), None);
    }

    #[test]
    fn reset_with_new_duration() {
        let mut timer = Countdown::new(30);
        timer.reset(Some(120));
        assert_eq!(timer.remaining_secs(), 120);
        assert_eq!(timer.duration_secs(), 30);
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn reset_after_expiry_allows_another_run() {
        let t0 = Instant::now();
        let mut timer = Countdown::new(1);
        timer.start(t0);
        assert_eq!(timer.poll(t0 + secs(1)), Some(Expired));

        timer.reset(None);
        timer.start(t0 + secs(2));
        assert_eq!(timer.poll(t0 + secs(3)), Some(Expired));
    }

    #[test]
    fn zero_duration_never_starts() {
        let t0 = Instant::now();
        let mut timer = Countdown::new(0);
        timer.start(t0);
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.poll(t0 + secs(1)), None);
    }
}
