//! Compile-time arch configuration.
//!
//! The `ArchConfig` trait carries timing and feature knobs as associated
//! consts (zero runtime cost). Implement it by hand or with
//! `#[derive(ArchConfig)]`, which starts from [`DefaultConfig`] and applies
//! `#[arch_config(...)]` overrides.

/// Arch configuration trait.
pub trait ArchConfig {
    /// Periodic worker interval in milliseconds (default: 50)
    const SLEEP_CHECK_MS: u32;

    /// Minimum gap between sleep-counter ticks in poll mode, in µs (default: 1000)
    const POLL_SLEEP_TICK_US: u64;

    /// Interval between stats dumps in milliseconds (default: 30000)
    const STATS_DUMP_INTERVAL_MS: u32;

    /// Dump stats to the log periodically (default: false)
    const USE_STATS: bool;

    /// Prefer a MAC address from OTP over the board-id derived one (default: true)
    const USE_OTP_MAC: bool;

    /// Hostname handed to the network stack (default: "PicoUSB")
    const HOST_NAME: &'static str;
}

/// Periodic worker runs between two stats dumps (at least 1).
///
/// A zero `SLEEP_CHECK_MS` dumps on every run.
pub(crate) const fn stats_dump_every<C: ArchConfig>() -> u32 {
    match C::STATS_DUMP_INTERVAL_MS.checked_div(C::SLEEP_CHECK_MS) {
        Some(0) | None => 1,
        Some(runs) => runs,
    }
}

/// Default configuration.
///
/// - SLEEP_CHECK_MS: 50
/// - POLL_SLEEP_TICK_US: 1000
/// - STATS_DUMP_INTERVAL_MS: 30000
/// - USE_STATS: false
/// - USE_OTP_MAC: true
/// - HOST_NAME: "PicoUSB"
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DefaultConfig;

impl ArchConfig for DefaultConfig {
    const SLEEP_CHECK_MS: u32 = 50;
    const POLL_SLEEP_TICK_US: u64 = 1000;
    const STATS_DUMP_INTERVAL_MS: u32 = 30_000;
    const USE_STATS: bool = false;
    const USE_OTP_MAC: bool = true;
    const HOST_NAME: &'static str = "PicoUSB";
}

/// Low-power configuration.
///
/// Services the stack four times less often than [`DefaultConfig`]:
/// - SLEEP_CHECK_MS: 200
/// - POLL_SLEEP_TICK_US: 4000
/// - other values as in [`DefaultConfig`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LowPowerConfig;

impl ArchConfig for LowPowerConfig {
    const SLEEP_CHECK_MS: u32 = 200;
    const POLL_SLEEP_TICK_US: u64 = 4000;
    const STATS_DUMP_INTERVAL_MS: u32 = DefaultConfig::STATS_DUMP_INTERVAL_MS;
    const USE_STATS: bool = DefaultConfig::USE_STATS;
    const USE_OTP_MAC: bool = DefaultConfig::USE_OTP_MAC;
    const HOST_NAME: &'static str = DefaultConfig::HOST_NAME;
}
