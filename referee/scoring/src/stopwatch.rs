//! # Chrono
//!
//! Elapsed run time for one scoring pass.
//!
//! ## States
//!
//! - `Idle` -> `Running` -> `Paused` -> `Running` -> ...
//! - `reset` goes back to `Idle` from anywhere, elapsed drops to the initial value
//!
//! ## Timing
//!
//! - Running epoch is captured from the injected [`Clock`] on every start
//! - Pause folds `now - epoch` into the accumulated value
//! - Elapsed is always `accumulated + (now - epoch)`, never ticks times interval,
//!   so any number of pause/resume cycles adds zero drift
//!
//! ## Notifications
//!
//! Events are queued, not dispatched. The host drains them with
//! [`Stopwatch::drain_events`] on its next loop turn.
use std::{
    collections::VecDeque,
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> Duration;
}

#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChronoState {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChronoEvent {
    /// Whole seconds elapsed.
    Elapsed(u64),
    RunningChanged(bool),
    Reset,
}

#[derive(Debug, Clone)]
pub struct Stopwatch {
    clock: Arc<dyn Clock>,
    initial: Duration,
    accumulated: Duration,
    epoch: Option<Duration>,
    state: ChronoState,
    last_whole: u64,
    pending: VecDeque<ChronoEvent>,
}

impl Stopwatch {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_initial(clock, Duration::ZERO)
    }

    pub fn with_initial(clock: Arc<dyn Clock>, initial: Duration) -> Self {
        Self {
            clock,
            initial,
            accumulated: Duration::ZERO,
            epoch: None,
            state: ChronoState::Idle,
            last_whole: initial.as_secs(),
            pending: VecDeque::new(),
        }
    }

    pub fn state(&self) -> ChronoState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ChronoState::Running
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        self.epoch = Some(self.clock.now());
        self.state = ChronoState::Running;
        self.pending.push_back(ChronoEvent::RunningChanged(true));
    }

    pub fn pause(&mut self) {
        if !self.is_running() {
            return;
        }

        // flush whole seconds reached before the fold
        self.sample();

        if let Some(epoch) = self.epoch.take() {
            self.accumulated += self.clock.now().saturating_sub(epoch);
        }
        self.state = ChronoState::Paused;
        self.pending.push_back(ChronoEvent::RunningChanged(false));
    }

    pub fn toggle(&mut self) {
        if self.is_running() {
            self.pause();
        } else {
            self.start();
        }
    }

    pub fn reset(&mut self) {
        let was_running = self.is_running();

        self.accumulated = Duration::ZERO;
        self.epoch = None;
        self.state = ChronoState::Idle;
        self.last_whole = self.initial.as_secs();

        if was_running {
            self.pending.push_back(ChronoEvent::RunningChanged(false));
        }
        self.pending
            .push_back(ChronoEvent::Elapsed(self.initial.as_secs()));
        self.pending.push_back(ChronoEvent::Reset);
    }

    pub fn elapsed(&self) -> Duration {
        let live = match (self.state, self.epoch) {
            (ChronoState::Running, Some(epoch)) => self.clock.now().saturating_sub(epoch),
            _ => Duration::ZERO,
        };

        self.initial + self.accumulated + live
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// Queues an `Elapsed` event for every whole second crossed since the last sample.
    /// Safe to call at any frequency.
    pub fn sample(&mut self) {
        if !self.is_running() {
            return;
        }

        let whole = self.elapsed().as_secs();
        while self.last_whole < whole {
            self.last_whole += 1;
            self.pending
                .push_back(ChronoEvent::Elapsed(self.last_whole));
        }
    }

    pub fn drain_events(&mut self) -> Vec<ChronoEvent> {
        self.pending.drain(..).collect()
    }

    pub fn display(&self) -> String {
        format_chrono(self.elapsed_secs())
    }
}

/// `M:SS`, fractional seconds truncated.
pub fn format_chrono(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };

    format!("{}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn manual() -> (ManualClock, Stopwatch) {
        let clock = ManualClock::new();
        let stopwatch = Stopwatch::new(Arc::new(clock.clone()));
        (clock, stopwatch)
    }

    #[test]
    fn test_format() {
        assert_eq!(format_chrono(0.0), "0:00");
        assert_eq!(format_chrono(7.3), "0:07");
        assert_eq!(format_chrono(59.999), "0:59");
        assert_eq!(format_chrono(60.0), "1:00");
        assert_eq!(format_chrono(754.5), "12:34");
        assert_eq!(format_chrono(-3.0), "0:00");
        assert_eq!(format_chrono(f64::NAN), "0:00");
    }

    #[test]
    fn test_pause_resume_scenario() {
        let (clock, mut stopwatch) = manual();

        stopwatch.start();
        clock.advance(Duration::from_millis(5_300));
        stopwatch.pause();

        clock.advance(Duration::from_secs(40));
        assert_eq!(stopwatch.elapsed(), Duration::from_millis(5_300));

        stopwatch.start();
        clock.advance(Duration::from_secs(2));
        stopwatch.pause();

        assert_eq!(stopwatch.elapsed(), Duration::from_millis(7_300));
        assert_eq!(stopwatch.display(), "0:07");
    }

    #[test]
    fn test_start_is_idempotent() {
        let (clock, mut stopwatch) = manual();

        stopwatch.start();
        clock.advance(Duration::from_secs(3));
        stopwatch.start();
        clock.advance(Duration::from_secs(1));

        assert_eq!(stopwatch.elapsed(), Duration::from_secs(4));
        let running_events = stopwatch
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, ChronoEvent::RunningChanged(_)))
            .count();
        assert_eq!(running_events, 1);
    }

    #[test]
    fn test_pause_from_idle_is_noop() {
        let (_clock, mut stopwatch) = manual();

        stopwatch.pause();

        assert_eq!(stopwatch.state(), ChronoState::Idle);
        assert!(stopwatch.drain_events().is_empty());
    }

    #[test]
    fn test_reset_from_every_state() {
        let (clock, mut stopwatch) = manual();
        stopwatch.reset();
        assert_eq!(stopwatch.state(), ChronoState::Idle);
        assert_eq!(stopwatch.elapsed(), Duration::ZERO);

        stopwatch.start();
        clock.advance(Duration::from_secs(9));
        stopwatch.reset();
        assert_eq!(stopwatch.state(), ChronoState::Idle);
        assert_eq!(stopwatch.elapsed(), Duration::ZERO);

        stopwatch.start();
        clock.advance(Duration::from_secs(2));
        stopwatch.pause();
        stopwatch.reset();
        assert_eq!(stopwatch.state(), ChronoState::Idle);
        assert_eq!(stopwatch.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_reset_returns_to_initial() {
        let clock = ManualClock::new();
        let mut stopwatch = Stopwatch::with_initial(Arc::new(clock.clone()), Duration::from_secs(30));

        stopwatch.start();
        clock.advance(Duration::from_secs(5));
        assert_eq!(stopwatch.elapsed(), Duration::from_secs(35));
        stopwatch.drain_events();

        stopwatch.reset();

        assert_eq!(stopwatch.elapsed(), Duration::from_secs(30));
        assert_eq!(
            stopwatch.drain_events(),
            vec![
                ChronoEvent::RunningChanged(false),
                ChronoEvent::Elapsed(30),
                ChronoEvent::Reset
            ]
        );
    }

    #[test]
    fn test_whole_second_events() {
        let (clock, mut stopwatch) = manual();

        stopwatch.start();
        for _ in 0..25 {
            clock.advance(Duration::from_millis(100));
            stopwatch.sample();
        }

        assert_eq!(
            stopwatch.drain_events(),
            vec![
                ChronoEvent::RunningChanged(true),
                ChronoEvent::Elapsed(1),
                ChronoEvent::Elapsed(2)
            ]
        );
    }

    #[test]
    fn test_events_are_queued_until_drained() {
        let (_clock, mut stopwatch) = manual();

        stopwatch.toggle();
        stopwatch.toggle();

        assert_eq!(
            stopwatch.drain_events(),
            vec![
                ChronoEvent::RunningChanged(true),
                ChronoEvent::RunningChanged(false)
            ]
        );
        assert!(stopwatch.drain_events().is_empty());
    }

    proptest! {
        #[test]
        fn elapsed_equals_running_wall_time(cycles in proptest::collection::vec((0u64..5_000, 0u64..5_000), 0..40)) {
            let (clock, mut stopwatch) = manual();
            let mut expected = Duration::ZERO;

            for (running_ms, paused_ms) in cycles {
                stopwatch.start();
                clock.advance(Duration::from_millis(running_ms));
                stopwatch.sample();
                stopwatch.pause();
                expected += Duration::from_millis(running_ms);

                clock.advance(Duration::from_millis(paused_ms));
            }

            prop_assert_eq!(stopwatch.elapsed(), expected);
        }
    }
}
