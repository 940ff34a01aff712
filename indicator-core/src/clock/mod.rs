//! Monotonic time abstraction shared by firmware and host targets.
//!
//! The controller never needs absolute time; every decision is an
//! elapsed-time comparison against a monotonic mark. Keeping the instant
//! type behind a trait lets the same state machine run against
//! `embassy_time::Instant` on the MCU and a plain millisecond counter in
//! tests and the emulator.

use core::time::Duration;

/// Trait implemented by monotonic instant wrappers used for elapsed-time checks.
pub trait MonotonicInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Millisecond tick counter satisfying [`MonotonicInstant`].
///
/// Host-side targets (the emulator, unit tests) drive the controller with
/// this type; firmware substitutes its own wrapper around the HAL instant.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct TickInstant(u64);

impl TickInstant {
    /// Creates an instant at the provided millisecond offset from boot.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the raw millisecond offset.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns this instant advanced by `millis`.
    #[must_use]
    pub const fn advanced_by(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

impl MonotonicInstant for TickInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}
