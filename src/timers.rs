//! Instant-based scheduling primitives: the search debounce window, the
//! kitchen countdown, and the reload countdown. Every method takes `now`
//! explicitly so tests drive them with a simulated clock.

use std::time::{Duration, Instant};

/// Collapses a burst of keystrokes into one search. Each input cancels
/// the previous deadline and schedules a new one; the pending search
/// fires only after a full quiet window.
#[derive(Debug)]
pub struct SearchDebounce {
    window: Duration,
    deadline: Option<Instant>,
}

impl SearchDebounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn note_input(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True at most once per scheduled deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// A kitchen countdown anchored to an absolute end point. Remaining time
/// is recomputed from that end point on every tick, never decremented,
/// so a delayed tick cannot make the display drift.
#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    total_secs: u64,
    end: Instant,
}

impl Countdown {
    pub fn start(total_secs: u64, now: Instant) -> Self {
        Self {
            total_secs,
            end: now + Duration::from_secs(total_secs),
        }
    }

    pub fn remaining_secs(&self, now: Instant) -> u64 {
        self.end.saturating_duration_since(now).as_secs()
    }

    /// Elapsed share of the countdown, 0–100, for the progress gauge.
    pub fn progress_percent(&self, now: Instant) -> f64 {
        if self.total_secs == 0 {
            return 100.0;
        }
        let remaining = self.remaining_secs(now);
        (self.total_secs - remaining) as f64 / self.total_secs as f64 * 100.0
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.remaining_secs(now) == 0
    }

    /// `m:ss` with zero-padded seconds ("2:05").
    pub fn display(&self, now: Instant) -> String {
        let remaining = self.remaining_secs(now);
        format!("{}:{:02}", remaining / 60, remaining % 60)
    }
}

/// The five-second grace message shown while the kiosk page rebuilds
/// after a maintenance request. The displayed count never reaches zero:
/// once a single second remains, the singular wording holds until the
/// refresh fires.
#[derive(Debug, Clone, Copy)]
pub struct ReloadCountdown {
    started: Instant,
    delay: Duration,
}

impl ReloadCountdown {
    pub fn new(delay_secs: u64, now: Instant) -> Self {
        Self {
            started: now,
            delay: Duration::from_secs(delay_secs),
        }
    }

    pub fn message(&self, now: Instant) -> String {
        let elapsed = now.saturating_duration_since(self.started).as_secs();
        let left = self.delay.as_secs().saturating_sub(elapsed);
        if left <= 1 {
            "Page reloading in 1 second".to_string()
        } else {
            format!("Page reloading in {left} seconds")
        }
    }

    /// True once the full delay has elapsed; the refresh happens here no
    /// matter what the message loop last displayed.
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.delay
    }
}
