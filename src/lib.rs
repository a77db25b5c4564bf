//! # tusb-arch
//!
//! Integration layer for a USB network driver and an optional TCP/IP stack
//! on dual-core microcontrollers (RP2040 class).
//!
//! Neither the driver nor the stack is reentrant, and both need periodic
//! servicing. This crate decides *when* and *on which core* that servicing
//! runs, and forwards init/poll/connect calls to them.
//!
//! **Modes** (exactly one cargo feature):
//! - `poll` - the application calls `poll()` from its main loop; not
//!   multi-core or IRQ safe
//! - `threadsafe-background` (default) - servicing runs in a low-priority IRQ
//!   on the core that called `init`; calls from either core are serialized
//!   by a recursive mutex
//! - `rtos` - servicing runs in a dedicated RTOS task
//!
//! All three arch types are always available; the feature picks the one
//! exported as [`SelectedArch`].
//!
//! Hardware, driver and stack are reached through traits ([`platform`],
//! [`driver`]), so the whole layer runs on the host with simulated cores.
//!
//! ## Optional Features
//!
//! - `async` - `connect_until_async` for async executors
//! - `defmt` / `log` - logging backend (at most one)
//!
//! The library provides a `#[derive(ArchConfig)]` macro that's always available.
//!
//! This library is `no_std` compatible.

#![no_std]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

#[cfg(not(any(feature = "poll", feature = "threadsafe-background", feature = "rtos")))]
compile_error!("Enable one arch mode feature: `poll`, `threadsafe-background` or `rtos`.");

#[cfg(any(
    all(feature = "poll", feature = "threadsafe-background"),
    all(feature = "poll", feature = "rtos"),
    all(feature = "threadsafe-background", feature = "rtos"),
))]
compile_error!("Arch mode features `poll`, `threadsafe-background` and `rtos` are mutually exclusive.");

// Must come first: the logging macros are textually scoped
mod fmt;

// Re-export derive macro (always available)
pub use tusb_arch_macros::ArchConfig;

// ============================================================================
// Module Declarations
// ============================================================================

pub mod config;
pub mod error;
pub mod time;

// Seams to hardware, driver and network stack
pub mod driver;
pub mod mac;
pub mod platform;

// Building blocks
pub mod dispatch;
pub mod stats;
pub mod sync;

// Modes
pub mod arch;

// ============================================================================
// Re-exports - Public API
// ============================================================================

pub use config::{ArchConfig, DefaultConfig, LowPowerConfig};
pub use error::{ArchError, status_code};
pub use time::{Deadline, Duration, Instant};

pub use driver::{LinkStatus, NetStack, NoNetStack, UsbDriver};
pub use mac::MacAddress;
pub use platform::{
    AlarmId, AlarmPool, BackgroundPlatform, BoardId, Clock, CoreId, Cores, IrqLines, OwnerId,
    Platform, RtosPlatform, TaskSignal,
};

pub use dispatch::{DispatchFn, DispatchTable, Slot};
pub use stats::{Stat, Stats};
pub use sync::{LockState, RecursiveMutex, WorkSignal};

pub use arch::{Arch, BackgroundArch, DriverPort, LwipGuard, Mode, PollArch, RtosArch};

#[cfg(feature = "async")]
pub use arch::connect::{AsyncWait, connect_until_async};

// ============================================================================
// Mode selection
// ============================================================================

/// Arch type selected by the enabled mode feature.
#[cfg(feature = "poll")]
pub type SelectedArch<P, D, N = NoNetStack, C = DefaultConfig> = PollArch<P, D, N, C>;

/// Arch type selected by the enabled mode feature.
#[cfg(feature = "threadsafe-background")]
pub type SelectedArch<P, D, N = NoNetStack, C = DefaultConfig> = BackgroundArch<P, D, N, C>;

/// Arch type selected by the enabled mode feature.
#[cfg(feature = "rtos")]
pub type SelectedArch<P, D, N = NoNetStack, C = DefaultConfig> = RtosArch<P, D, N, C>;

/// Mode selected by the enabled mode feature.
#[cfg(feature = "poll")]
pub const MODE: Mode = Mode::Poll;

/// Mode selected by the enabled mode feature.
#[cfg(feature = "threadsafe-background")]
pub const MODE: Mode = Mode::ThreadsafeBackground;

/// Mode selected by the enabled mode feature.
#[cfg(feature = "rtos")]
pub const MODE: Mode = Mode::Rtos;

// ============================================================================
// Library Metadata
// ============================================================================

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
