//! Trailing-edge coalescing of overlay redraws
//!
//! Continuous pan and zoom request a redraw on every pointer event. The
//! overlay is a pure function of engine state, so only the last request of
//! a burst needs a frame. A frame becomes due once requests have been quiet
//! for `quiet_period`, or once `max_latency` has passed since the first
//! request of the burst so a long drag still refreshes.
//!
//! Times are passed in explicitly; the scheduler never reads the clock.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Burst {
    first_requested_at: Instant,
    last_requested_at: Instant,
}

/// Debounces redraw requests into frames
#[derive(Debug, Clone)]
pub struct RedrawScheduler {
    quiet_period: Duration,
    max_latency: Duration,
    burst: Option<Burst>,
}

impl RedrawScheduler {
    pub fn new(quiet_period: Duration, max_latency: Duration) -> Self {
        Self {
            quiet_period,
            max_latency,
            burst: None,
        }
    }

    /// Record a redraw request; returns `true` when this starts a new burst
    pub fn request_at(&mut self, now: Instant) -> bool {
        match &mut self.burst {
            Some(burst) => {
                burst.last_requested_at = now;
                false
            }
            None => {
                self.burst = Some(Burst {
                    first_requested_at: now,
                    last_requested_at: now,
                });
                true
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.burst.is_some()
    }

    /// Whether a frame should be produced at `now`
    pub fn is_due_at(&self, now: Instant) -> bool {
        let Some(burst) = self.burst else {
            return false;
        };

        now.saturating_duration_since(burst.last_requested_at) >= self.quiet_period
            || now.saturating_duration_since(burst.first_requested_at) >= self.max_latency
    }

    /// Consume the pending burst if it is due
    pub fn take_due_at(&mut self, now: Instant) -> bool {
        if self.is_due_at(now) {
            self.burst = None;
            true
        } else {
            false
        }
    }

    /// Consume the pending burst regardless of timing
    pub fn flush(&mut self) -> bool {
        self.burst.take().is_some()
    }

    /// Time until the pending burst becomes due, `None` when idle
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        let burst = self.burst?;
        let quiet_deadline = burst.last_requested_at + self.quiet_period;
        let latency_deadline = burst.first_requested_at + self.max_latency;
        Some(quiet_deadline.min(latency_deadline).saturating_duration_since(now))
    }
}
