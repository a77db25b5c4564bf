//! Hardware abstraction for the arch layer.
//!
//! The arch never touches registers. Cores, clock, interrupt lines and the
//! alarm pool are reached through the traits below, implemented once per
//! board (e.g. on top of `rp2040-hal`) or by a simulated platform in tests.
//!
//! Interrupt *entry points* run the other way round: the board's interrupt
//! handlers call into the arch (`on_service_irq`, `on_wake_irq`,
//! `on_periodic_alarm`), so no callback registration is needed here.

use crate::error::ArchError;
use crate::time::{Deadline, Duration, Instant};

/// Processor core number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CoreId(pub u8);

/// Identity of a lock owner.
///
/// On bare metal this is the core number; under an RTOS it is the task
/// handle. Interrupts on a core share that core's identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OwnerId(pub u32);

impl From<CoreId> for OwnerId {
    fn from(core: CoreId) -> Self {
        OwnerId(core.0 as u32)
    }
}

/// Handle of a repeating alarm.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmId(pub u32);

/// Unique board identifier (flash unique id on the RP2040).
pub type BoardId = [u8; 8];

/// Clock and low-power waiting.
pub trait Clock {
    /// Current time.
    fn now(&self) -> Instant;

    /// Sleep until an event is signalled or the deadline passes.
    ///
    /// Best effort: may return early (spurious wake-ups are fine).
    fn wait_for_event_until(&self, deadline: Deadline);

    /// Signal an event to all cores (SEV).
    fn send_event(&self);

    /// Block the calling thread context until `until`.
    fn sleep_until(&self, until: Instant);

    /// Spin until `until`. Used where sleeping is not allowed (interrupts).
    fn busy_wait_until(&self, until: Instant);
}

/// Execution context information.
pub trait Cores {
    /// Core executing the caller.
    fn core_id(&self) -> CoreId;

    /// Lock identity of the caller (core number, or task handle under an RTOS).
    fn lock_owner_id(&self) -> OwnerId;

    /// Whether the caller runs in an exception/interrupt handler.
    fn in_interrupt(&self) -> bool;

    /// Unique board id, used to derive a MAC address when none is in OTP.
    fn unique_board_id(&self) -> BoardId;

    /// Bring up board peripherals needed by the driver (clocks, pins, PHY).
    fn board_init(&self);
}

/// Interrupt lines used for deferred dispatch.
pub trait IrqLines {
    /// Mark the low-priority service IRQ pending on the calling core.
    fn pend_service_irq(&self);

    /// Force the wake IRQ (the driver's host-wake GPIO) on `core`.
    fn force_wake_irq(&self, core: CoreId);

    /// Clear the force bit set by [`IrqLines::force_wake_irq`] on `core`.
    fn clear_wake_irq(&self, core: CoreId);

    /// Enable or disable the level-triggered wake IRQ.
    fn set_wake_irq_enabled(&self, enabled: bool);
}

/// Repeating alarms.
pub trait AlarmPool {
    /// Start an alarm firing every `interval`. The board's alarm handler must
    /// call `on_periodic_alarm` and re-arm with the interval it returns.
    fn start_periodic(&self, interval: Duration) -> Result<AlarmId, ArchError>;

    /// Cancel an alarm started by [`AlarmPool::start_periodic`].
    fn cancel(&self, id: AlarmId);
}

/// Task signalling for the RTOS mode.
pub trait TaskSignal {
    /// Wake the service task.
    fn notify_service(&self);

    /// Block the service task until notified or the deadline passes.
    ///
    /// Returns `true` if a notification was consumed.
    fn wait_service_notify(&self, deadline: Deadline) -> bool;
}

/// Everything the polling mode needs.
pub trait Platform: Clock + Cores {}

impl<T: Clock + Cores> Platform for T {}

/// Everything the thread-safe background mode needs.
pub trait BackgroundPlatform: Platform + IrqLines + AlarmPool {}

impl<T: Platform + IrqLines + AlarmPool> BackgroundPlatform for T {}

/// Everything the RTOS mode needs.
pub trait RtosPlatform: Platform + TaskSignal {}

impl<T: Platform + TaskSignal> RtosPlatform for T {}
