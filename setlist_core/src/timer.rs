//! Session timers driven by the caller.
//!
//! Neither timer touches the sequence, records or targets. The rest countdown
//! only answers "is the user resting?" and the clock only feeds elapsed time.

use std::time::Instant;

/// Countdown started when the session signals a rest
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestTimer {
    remaining: u64,
}

impl RestTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a rest of `seconds`
    pub fn start(&mut self, seconds: u64) {
        self.remaining = seconds;
        tracing::debug!("Rest started: {}s", seconds);
    }

    /// Count down; returns true when this tick ended the rest
    pub fn tick(&mut self, seconds: u64) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(seconds);
        self.remaining == 0
    }

    /// Cancel the rest immediately
    pub fn skip(&mut self) {
        if self.remaining > 0 {
            tracing::debug!("Rest skipped with {}s left", self.remaining);
        }
        self.remaining = 0;
    }

    pub fn is_resting(&self) -> bool {
        self.remaining > 0
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

/// Turns wall-clock time into whole-second ticks
#[derive(Clone, Debug)]
pub struct ElapsedClock {
    started: Instant,
    reported: u64,
}

impl ElapsedClock {
    pub fn start() -> Self {
        Self::start_at(Instant::now())
    }

    pub fn start_at(started: Instant) -> Self {
        Self {
            started,
            reported: 0,
        }
    }

    /// Whole seconds passed at `now` that have not been reported yet
    pub fn take_ticks_at(&mut self, now: Instant) -> u64 {
        let total = now.saturating_duration_since(self.started).as_secs();
        let ticks = total.saturating_sub(self.reported);
        self.reported = total.max(self.reported);
        ticks
    }

    pub fn take_ticks(&mut self) -> u64 {
        self.take_ticks_at(Instant::now())
    }
}
