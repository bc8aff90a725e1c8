//! Tick deadlines and throttles.
//!
//! A `TimeoutSupervisor` measures ticks since its last [`reset`].  Tasks use
//! one as a deadline (the scheduler force-aborts the task once it expires);
//! decision tasks use more as throttles for work that should not run every
//! tick.
//!
//! [`reset`]: TimeoutSupervisor::reset

use npc_core::{SimClock, Tick};

/// What `expired` reports after the deadline has passed.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeoutMode {
    /// `true` on every check until reset.
    #[default]
    Repeating,
    /// `true` exactly once, then `false` until reset.
    OneShot,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeoutSupervisor {
    /// `None` never expires.
    duration: Option<u64>,
    started:  Tick,
    mode:     TimeoutMode,
    fired:    bool,
    forced:   bool,
}

impl TimeoutSupervisor {
    /// Repeating deadline of `ticks` ticks.
    pub fn new(ticks: u64) -> Self {
        Self {
            duration: Some(ticks),
            started:  Tick::ZERO,
            mode:     TimeoutMode::Repeating,
            fired:    false,
            forced:   false,
        }
    }

    /// Repeating deadline expressed in simulated milliseconds.
    pub fn from_millis(ms: u64, clock: &SimClock) -> Self {
        Self::new(clock.ticks_for_ms(ms))
    }

    pub fn one_shot(ticks: u64) -> Self {
        Self { mode: TimeoutMode::OneShot, ..Self::new(ticks) }
    }

    /// A supervisor that never expires.
    pub fn disabled() -> Self {
        Self { duration: None, ..Self::new(0) }
    }

    #[inline]
    pub fn duration(&self) -> Option<u64> {
        self.duration
    }

    #[inline]
    pub fn mode(&self) -> TimeoutMode {
        self.mode
    }

    #[inline]
    pub fn started(&self) -> Tick {
        self.started
    }

    /// Restart the countdown from `now`.
    pub fn reset(&mut self, now: Tick) {
        self.started = now;
        self.fired = false;
        self.forced = false;
    }

    /// Make the next `expired` check succeed regardless of elapsed time.
    /// Throttles use this so the first evaluation happens immediately.
    pub fn expire_now(&mut self) {
        self.forced = true;
    }

    /// Has the deadline passed?  See [`TimeoutMode`] for repeat behavior.
    pub fn expired(&mut self, now: Tick) -> bool {
        if !self.is_elapsed(now) {
            return false;
        }
        match self.mode {
            TimeoutMode::Repeating => true,
            TimeoutMode::OneShot => {
                if self.fired {
                    false
                } else {
                    self.fired = true;
                    true
                }
            }
        }
    }

    /// Non-consuming check: `true` once `now - started >= duration`.
    pub fn is_elapsed(&self, now: Tick) -> bool {
        if self.forced {
            return true;
        }
        match self.duration {
            Some(d) => now.since(self.started) >= d,
            None => false,
        }
    }

    /// Throttle helper: `true` at most once per interval, restarting the
    /// countdown whenever it fires.
    pub fn ready(&mut self, now: Tick) -> bool {
        if self.expired(now) {
            self.reset(now);
            true
        } else {
            false
        }
    }

    /// Ticks left before expiry; `None` when disabled.
    pub fn remaining(&self, now: Tick) -> Option<u64> {
        self.duration.map(|d| d.saturating_sub(now.since(self.started)))
    }
}

impl Default for TimeoutSupervisor {
    fn default() -> Self {
        Self::disabled()
    }
}
