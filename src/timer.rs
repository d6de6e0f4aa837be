//! Cooking timer
//!
//! A pure countdown ticked once per second by the session loop. Keeping the
//! timer free of clocks and tasks makes the alert-exactly-once and
//! restart-resets-remaining invariants directly testable.

/// Outcome of a timer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// Timer is not running
    Inactive,
    /// Timer is counting down; seconds remaining after this tick
    Running(u32),
    /// Timer just reached zero; the alert fires on exactly this tick
    Finished,
}

/// Countdown timer for a cooking session
#[derive(Debug, Default)]
pub struct CookingTimer {
    remaining: u32,
    active: bool,
}

impl CookingTimer {
    /// Create an inactive timer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            remaining: 0,
            active: false,
        }
    }

    /// Start (or restart) the countdown at `minutes` minutes. Restarting a
    /// running timer discards the previous remaining time. Durations beyond
    /// `u32::MAX` seconds saturate.
    pub const fn start(&mut self, minutes: u32) {
        self.start_seconds(minutes.saturating_mul(60));
    }

    /// Start (or restart) the countdown at `seconds` seconds
    pub const fn start_seconds(&mut self, seconds: u32) {
        self.remaining = seconds;
        self.active = seconds > 0;
    }

    /// Stop the countdown without alerting
    pub const fn stop(&mut self) {
        self.active = false;
        self.remaining = 0;
    }

    /// Advance the countdown by one second
    pub const fn tick(&mut self) -> TimerTick {
        if !self.active {
            return TimerTick::Inactive;
        }

        self.remaining -= 1;
        if self.remaining == 0 {
            self.active = false;
            return TimerTick::Finished;
        }
        TimerTick::Running(self.remaining)
    }

    /// Whether the countdown is running
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Seconds remaining (zero when inactive)
    #[must_use]
    pub const fn remaining_seconds(&self) -> u32 {
        self.remaining
    }
}

/// Format seconds as "M:SS" for display
#[must_use]
pub fn format_remaining(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
