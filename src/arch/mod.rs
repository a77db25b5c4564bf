//! Arch modes and the contract they share.
//!
//! Three modes implement [`Arch`]:
//!
//! - [`PollArch`]: single context, the caller services everything from its
//!   main loop via [`Arch::poll`]
//! - [`BackgroundArch`]: recursive mutex + low-priority IRQ dispatch on the
//!   owner core
//! - [`RtosArch`]: recursive mutex + a service task woken by task signals
//!
//! The cargo feature selects which one the crate exports as `SelectedArch`.
//! All three are always compiled.

use crate::driver::LinkStatus;
use crate::error::ArchError;
use crate::mac::MacAddress;
use crate::time::{Deadline, Duration, Instant};

pub mod background;
pub mod connect;
pub mod poll;
pub mod rtos;
mod service;

pub use background::BackgroundArch;
pub use poll::PollArch;
pub use rtos::RtosArch;

/// Operating mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Caller services driver and stack by calling `poll`
    Poll,
    /// Servicing in a low-priority IRQ on the owner core
    ThreadsafeBackground,
    /// Servicing in a dedicated RTOS task
    Rtos,
}

/// Application-facing contract shared by all modes.
pub trait Arch {
    /// Mode implemented by this type.
    const MODE: Mode;

    /// Bring up board, driver and network stack. Call once, before anything else.
    fn init(&self) -> Result<(), ArchError>;

    /// Tear down. Must be called from the same context as [`Arch::init`].
    fn deinit(&self);

    /// Current time.
    fn now(&self) -> Instant;

    /// How often background servicing runs.
    fn service_interval(&self) -> Duration;

    /// Service outstanding driver and stack work.
    ///
    /// Mandatory in poll mode; a no-op elsewhere.
    fn poll(&self);

    /// Sleep until background work ran or `deadline` passed.
    fn wait_for_work_until(&self, deadline: Deadline);

    /// Start connecting without waiting.
    fn connect_async(&self) -> Result<(), ArchError>;

    /// Current link status.
    fn link_status(&self) -> LinkStatus;

    /// Acquire whatever is needed to call into the network stack.
    ///
    /// Not needed (but harmless) inside network stack callbacks.
    fn lwip_begin(&self);

    /// Release what [`Arch::lwip_begin`] acquired.
    fn lwip_end(&self);

    /// Panic unless it is safe to call into the network stack from here.
    ///
    /// Checks only in debug builds.
    fn lwip_check(&self);

    /// Connect, waiting until the link is up, fails, or `deadline` passes.
    fn connect_until(&self, deadline: Deadline) -> Result<(), ArchError> {
        connect::connect_until(self, deadline)
    }

    /// Connect, waiting until the link is up or fails.
    fn connect_blocking(&self) -> Result<(), ArchError> {
        self.connect_until(Deadline::Never)
    }

    /// Connect, giving up after `timeout_ms`.
    fn connect_timeout_ms(&self, timeout_ms: u32) -> Result<(), ArchError> {
        self.connect_until(Deadline::after_ms(self.now(), timeout_ms))
    }

    /// Run `f` with the network-stack lock held and return its result.
    fn lwip_protect<R>(&self, f: impl FnOnce() -> R) -> R
    where
        Self: Sized,
    {
        let _guard = self.lwip_lock();
        f()
    }

    /// Scoped [`Arch::lwip_begin`]; the returned guard calls [`Arch::lwip_end`].
    fn lwip_lock(&self) -> LwipGuard<'_, Self>
    where
        Self: Sized,
    {
        self.lwip_begin();
        LwipGuard { arch: self }
    }
}

/// What the USB driver needs from the arch it runs under.
pub trait DriverPort {
    /// Ask for the driver's poll routine to run soon, in the right context.
    fn schedule_internal_poll(&self);

    /// Enter the driver's critical section. Re-entrant.
    fn thread_enter(&self);

    /// Leave the driver's critical section.
    fn thread_exit(&self);

    /// Panic unless the caller is allowed to touch the driver (debug builds).
    fn thread_lock_check(&self);

    /// Called by the driver at the end of each poll.
    fn post_poll_hook(&self);

    /// Delay the caller. Busy-waits when called from an interrupt.
    fn delay(&self, duration: Duration);

    /// Driver is waiting on the bus and needs to be polled again.
    fn request_poll(&self);

    /// Set the number of service ticks before the next mandatory poll.
    fn set_sleep(&self, ticks: u32);

    /// MAC address for the network interface.
    fn mac_address(&self) -> MacAddress;

    /// Delay in milliseconds.
    fn delay_ms(&self, ms: u32) {
        self.delay(Duration::millis(ms as u64));
    }

    /// Delay in microseconds.
    fn delay_us(&self, us: u32) {
        self.delay(Duration::micros(us as u64));
    }
}

/// Guard returned by [`Arch::lwip_lock`].
pub struct LwipGuard<'a, A: Arch> {
    arch: &'a A,
}

impl<A: Arch> Drop for LwipGuard<'_, A> {
    fn drop(&mut self) {
        self.arch.lwip_end();
    }
}

impl<A: Arch> core::fmt::Debug for LwipGuard<'_, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LwipGuard")
            .field("mode", &A::MODE)
            .finish_non_exhaustive()
    }
}
