//! Time types.
//!
//! Instants and durations are 64-bit microsecond counts from `fugit`, matching
//! the RP2040 64-bit timer. [`Deadline`] adds the "never" deadline used by
//! blocking connects.

/// Microsecond timer instant (64-bit, never wraps in practice).
pub type Instant = fugit::TimerInstantU64<1_000_000>;

/// Microsecond timer duration.
pub type Duration = fugit::TimerDurationU64<1_000_000>;

/// Point in time at which a wait gives up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Deadline {
    /// Expires once the clock reaches this instant
    At(Instant),

    /// Never expires
    Never,
}

impl Deadline {
    /// Deadline `timeout_ms` milliseconds after `now`.
    pub fn after_ms(now: Instant, timeout_ms: u32) -> Self {
        Self::after(now, Duration::millis(timeout_ms as u64))
    }

    /// Deadline `timeout` after `now`. Saturates to [`Deadline::Never`].
    pub fn after(now: Instant, timeout: Duration) -> Self {
        match now.ticks().checked_add(timeout.ticks()) {
            Some(ticks) => Deadline::At(Instant::from_ticks(ticks)),
            None => Deadline::Never,
        }
    }

    /// Whether the deadline has passed at `now`.
    ///
    /// Compares raw ticks; fugit's ordering is wrap-aware and would misread
    /// far-apart 64-bit instants.
    pub fn is_reached(&self, now: Instant) -> bool {
        match self {
            Deadline::At(at) => now.ticks() >= at.ticks(),
            Deadline::Never => false,
        }
    }

    /// Time left until the deadline, `None` for [`Deadline::Never`].
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self {
            Deadline::At(at) => Some(Duration::from_ticks(at.ticks().saturating_sub(now.ticks()))),
            Deadline::Never => None,
        }
    }

    /// The earlier of two deadlines.
    pub fn min(self, other: Deadline) -> Deadline {
        match (self, other) {
            (Deadline::Never, d) | (d, Deadline::Never) => d,
            (Deadline::At(a), Deadline::At(b)) => {
                if a.ticks() <= b.ticks() {
                    Deadline::At(a)
                } else {
                    Deadline::At(b)
                }
            }
        }
    }
}
