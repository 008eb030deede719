use std::sync::Arc;

use tracing::debug;

use crate::{
    doors::{Door, DoorGrid, Doors},
    flow::FlowError,
    penalty::PenaltyCounter,
    stopwatch::{Clock, Stopwatch},
};

/// Packaged result of one scoring pass. Never changed after packaging.
#[derive(Debug, Clone, PartialEq)]
pub struct RunDraft {
    pub chrono_seconds: f64,
    pub penalty: u32,
    pub doors: Doors,
}

/// Live scoring pass: chrono, doors and penalty for one participant.
///
/// Doors stay locked until the chrono has been started once. Pausing or resetting the
/// chrono does not lock them again.
#[derive(Debug, Clone)]
pub struct RunSession {
    stopwatch: Stopwatch,
    grid: DoorGrid,
    penalty: PenaltyCounter,
    has_started: bool,
}

impl RunSession {
    pub fn new(clock: Arc<dyn Clock>, penalty_max: Option<u32>) -> Self {
        Self {
            stopwatch: Stopwatch::new(clock),
            grid: DoorGrid::new(true),
            penalty: PenaltyCounter::new(penalty_max),
            has_started: false,
        }
    }

    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    pub fn stopwatch_mut(&mut self) -> &mut Stopwatch {
        &mut self.stopwatch
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    pub fn doors(&self) -> Doors {
        self.grid.doors()
    }

    pub fn doors_locked(&self) -> bool {
        self.grid.is_disabled()
    }

    pub fn penalty(&self) -> u32 {
        self.penalty.value()
    }

    pub fn start_chrono(&mut self) {
        self.stopwatch.start();
        self.unlock();
    }

    pub fn pause_chrono(&mut self) {
        self.stopwatch.pause();
    }

    pub fn toggle_chrono(&mut self) {
        self.stopwatch.toggle();
        self.unlock();
    }

    pub fn reset_chrono(&mut self) {
        self.stopwatch.reset();
    }

    fn unlock(&mut self) {
        if self.stopwatch.is_running() && !self.has_started {
            debug!("Chrono started, unlocking doors");
            self.has_started = true;
            self.grid.set_disabled(false);
        }
    }

    pub fn toggle_door(&mut self, door: Door) -> Result<Doors, FlowError> {
        self.grid.toggle(door).ok_or(FlowError::DoorsLocked)
    }

    pub fn increment_penalty(&mut self) -> u32 {
        self.penalty.increment()
    }

    pub fn decrement_penalty(&mut self) -> u32 {
        self.penalty.decrement()
    }

    /// A run cannot be finalized mid-timing.
    pub fn can_finish(&self) -> bool {
        !self.stopwatch.is_running()
    }

    pub fn package(&self) -> Result<RunDraft, FlowError> {
        if !self.can_finish() {
            return Err(FlowError::ChronoRunning);
        }

        Ok(RunDraft {
            chrono_seconds: self.stopwatch.elapsed_secs(),
            penalty: self.penalty.value(),
            doors: self.grid.doors(),
        })
    }
}
