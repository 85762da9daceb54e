//! Round countdown.
//!
//! The countdown is a deadline owned by the peer's event loop rather than a
//! background timer: the host delivers ticks, the loop polls the countdown,
//! and cancelling it simply forgets the deadline. A cancelled countdown can
//! therefore never fire late.

#[cfg(not(target_arch = "wasm32"))]
pub use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
pub use web_time::{Duration, Instant};

/// What a poll observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// Whole seconds remaining dropped to this value.
    Tick { time_left: u32 },
    /// The round ran out of time. Reported once.
    Expired,
}

/// Countdown for the `drawing` state.
#[derive(Debug, Clone, Default)]
pub struct RoundCountdown {
    deadline: Option<Instant>,
    last_reported: u32,
}

impl RoundCountdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the countdown, replacing any running one.
    pub fn start(&mut self, seconds: u32, now: Instant) {
        self.deadline = Some(now + Duration::from_secs(seconds as u64));
        self.last_reported = seconds;
    }

    /// Disarm. Further polls report nothing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// Whole seconds left at `now`, rounded up.
    pub fn remaining(&self, now: Instant) -> Option<u32> {
        let deadline = self.deadline?;
        let left = deadline.saturating_duration_since(now);
        let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
        Some(secs.min(u32::MAX as u64) as u32)
    }

    /// Check the countdown against `now`.
    pub fn poll(&mut self, now: Instant) -> Option<CountdownEvent> {
        let remaining = self.remaining(now)?;
        if remaining == 0 {
            self.deadline = None;
            return Some(CountdownEvent::Expired);
        }
        if remaining < self.last_reported {
            self.last_reported = remaining;
            return Some(CountdownEvent::Tick { time_left: remaining });
        }
        None
    }
}
