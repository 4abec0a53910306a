//! Admission control
//!
//! Fixed one-minute window action budget. Bursts of up to twice the budget
//! are possible across a window boundary; that is accepted.

use std::sync::{Mutex, PoisonError};
use tokio::time::{Duration, Instant};

/// Length of one admission window
pub const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Rolling per-minute action budget
#[derive(Debug)]
pub struct RateLimiter {
    per_minute: u32,
    window: Mutex<Window>,
}

/// Point-in-time view of the limiter for inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterStatus {
    pub used: u32,
    pub budget: u32,
    pub resets_in: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing `per_minute` actions per window
    #[must_use]
    pub fn new(per_minute: u32) -> Self {
        Self::starting_at(per_minute, Instant::now())
    }

    /// Create a limiter whose first window starts at `now`
    #[must_use]
    pub fn starting_at(per_minute: u32, now: Instant) -> Self {
        Self {
            per_minute,
            window: Mutex::new(Window {
                started: now,
                count: 0,
            }),
        }
    }

    /// Take one unit of budget if available
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// [`try_acquire`](Self::try_acquire) against an explicit clock reading
    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        if now.saturating_duration_since(window.started) >= WINDOW {
            window.started = now;
            window.count = 0;
        }
        if window.count >= self.per_minute {
            return false;
        }
        window.count += 1;
        true
    }

    /// Current usage of the window
    #[must_use]
    pub fn status(&self) -> LimiterStatus {
        self.status_at(Instant::now())
    }

    #[must_use]
    pub fn status_at(&self, now: Instant) -> LimiterStatus {
        let window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = now.saturating_duration_since(window.started);
        if elapsed >= WINDOW {
            return LimiterStatus {
                used: 0,
                budget: self.per_minute,
                resets_in: Duration::ZERO,
            };
        }
        LimiterStatus {
            used: window.count,
            budget: self.per_minute,
            resets_in: WINDOW - elapsed,
        }
    }
}
