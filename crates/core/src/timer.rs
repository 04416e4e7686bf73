//! Countdown reconciled against wall-clock time.
//!
//! The timer never accumulates a running counter. Every tick recomputes
//! `remaining = duration - (now - started_at)` from absolute instants, so a
//! tick arriving after an arbitrarily long gap (suspended device, throttled
//! background tab) still reports the correct value.

use chrono::{DateTime, Utc};

/// What a single tick published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub remaining_seconds: u64,
    pub elapsed_seconds: u64,
    /// True on exactly one tick: the first one that observed zero remaining.
    pub expired_now: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownTimer {
    duration_seconds: u64,
    started_at: Option<DateTime<Utc>>,
    last_remaining: Option<u64>,
    expiry_fired: bool,
}

impl CountdownTimer {
    /// A timer armed with `duration_seconds` but not started.
    #[must_use]
    pub fn armed(duration_seconds: u64) -> Self {
        Self {
            duration_seconds,
            started_at: None,
            last_remaining: None,
            expiry_fired: false,
        }
    }

    /// Record the absolute start instant. Restarting clears any published state.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.started_at = Some(now);
        self.last_remaining = None;
        self.expiry_fired = false;
    }

    /// Back to armed-but-not-started with the same duration.
    pub fn reset(&mut self) {
        *self = Self::armed(self.duration_seconds);
    }

    #[must_use]
    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.expiry_fired
    }

    /// Whole seconds since start, clamped to `[0, duration]`.
    ///
    /// A clock that moved backwards yields `0` rather than a negative value.
    #[must_use]
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> u64 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        let elapsed = u64::try_from((now - started_at).num_seconds()).unwrap_or(0);
        elapsed.min(self.duration_seconds)
    }

    /// Remaining seconds at `now` without publishing anything.
    ///
    /// Never exceeds the last published value, so a backwards clock step
    /// cannot make the countdown climb.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        if self.started_at.is_none() {
            return self.duration_seconds;
        }
        let computed = self.duration_seconds - self.elapsed_at(now);
        match self.last_remaining {
            Some(last) => computed.min(last),
            None => computed,
        }
    }

    /// Recompute and publish remaining time.
    ///
    /// Returns `None` before `start`. Once remaining reaches zero the first
    /// tick reports `expired_now = true`; every later tick reports zero with
    /// `expired_now = false`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<TimerTick> {
        self.started_at?;

        let remaining_seconds = self.remaining_at(now);
        self.last_remaining = Some(remaining_seconds);

        let expired_now = remaining_seconds == 0 && !self.expiry_fired;
        if expired_now {
            self.expiry_fired = true;
        }

        Some(TimerTick {
            remaining_seconds,
            elapsed_seconds: self.duration_seconds - remaining_seconds,
            expired_now,
        })
    }
}
