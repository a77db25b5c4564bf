//! Thread-safe background mode.
//!
//! Driver and network-stack servicing runs in a low-priority service IRQ on
//! the core that called `init` (the owner core), regardless of which core asks
//! for it. Callers on either core, in tasks or in interrupts, serialize access
//! to the driver and the stack with a recursive mutex.
//!
//! The board wires three interrupt entry points to the instance (usually held
//! in a `static`):
//!
//! - the low-priority service IRQ (PendSV or a spare IRQ) → [`BackgroundArch::on_service_irq`]
//! - the driver's host-wake GPIO IRQ → [`BackgroundArch::on_wake_irq`]
//! - the repeating alarm → [`BackgroundArch::on_periodic_alarm`]

use core::cell::Cell;

use critical_section::Mutex;
use portable_atomic::{AtomicBool, Ordering};

use crate::arch::service::Service;
use crate::arch::{Arch, DriverPort, Mode};
use crate::config::{ArchConfig, DefaultConfig};
use crate::dispatch::{DispatchFn, DispatchTable, Slot};
use crate::driver::{LinkStatus, NetStack, NoNetStack, UsbDriver};
use crate::error::ArchError;
use crate::mac::MacAddress;
use crate::platform::{AlarmId, BackgroundPlatform, CoreId};
use crate::stats::{Stat, Stats};
use crate::time::{Deadline, Duration, Instant};

/// Thread-safe background arch.
///
/// Generic over:
/// - `P`: platform (cores, clock, IRQ lines, alarms)
/// - `D`: USB network driver
/// - `N`: network stack ([`NoNetStack`] when IP is not used)
/// - `C`: configuration
pub struct BackgroundArch<P, D, N = NoNetStack, C = DefaultConfig> {
    service: Service<P, D, N, C>,
    slots: DispatchTable<BackgroundArch<P, D, N, C>, { Slot::COUNT }>,
    alarm: Mutex<Cell<Option<AlarmId>>>,
    dispatch_missed: AtomicBool,
    in_service_irq: AtomicBool,
}

impl<P, D, N, C> BackgroundArch<P, D, N, C>
where
    P: BackgroundPlatform,
    D: UsbDriver,
    N: NetStack,
    C: ArchConfig,
{
    /// Create an uninitialized instance. Call [`Arch::init`] before use.
    pub const fn new(platform: P, driver: D, net: N) -> Self {
        Self {
            service: Service::new(platform, driver, net),
            slots: DispatchTable::new(),
            alarm: Mutex::new(Cell::new(None)),
            dispatch_missed: AtomicBool::new(false),
            in_service_irq: AtomicBool::new(false),
        }
    }

    /// Platform handle.
    pub fn platform(&self) -> &P {
        &self.service.platform
    }

    /// Driver handle. Call driver methods only inside the critical section.
    pub fn driver(&self) -> &D {
        &self.service.driver
    }

    /// Network stack handle. Call stack methods only inside the critical section.
    pub fn net(&self) -> &N {
        &self.service.net
    }

    /// Service counters.
    pub fn stats(&self) -> &Stats {
        &self.service.stats
    }

    /// Core that owns deferred dispatch (the core that called `init`).
    pub fn owner_core(&self) -> CoreId {
        self.service.owner_core()
    }

    /// Current sleep countdown.
    pub fn sleep(&self) -> u32 {
        self.service.sleep()
    }

    /// Whether a dispatch pass was skipped because the lock was held and has
    /// not been re-armed yet. The outermost `thread_exit` consumes it.
    pub fn dispatch_missed(&self) -> bool {
        self.dispatch_missed.load(Ordering::Acquire)
    }

    /// Whether `slot` has a callback waiting.
    pub fn is_pending(&self, slot: Slot) -> bool {
        self.slots.is_pending(slot.index())
    }

    // ========================================================================
    // Deferred dispatch
    // ========================================================================

    /// Run `f` later on the owner core, in the service IRQ.
    ///
    /// Replaces any callback already waiting in `slot`. Callable from any
    /// core and any context.
    pub fn schedule(&self, slot: Slot, f: DispatchFn<Self>) {
        self.slots.set(slot.index(), f);
        self.kick();
    }

    /// Make the service IRQ run on the owner core.
    ///
    /// On another core this goes through the owner's wake IRQ, whose handler
    /// schedules a driver poll; that poll is the one spurious extra call this
    /// costs.
    fn kick(&self) {
        let owner = self.owner_core();
        if self.platform().core_id() == owner {
            self.platform().pend_service_irq();
        } else {
            trace!("cross-core dispatch via wake irq on core {}", owner.0);
            self.platform().force_wake_irq(owner);
        }
    }

    /// Low-priority service IRQ handler. Must run on the owner core.
    pub fn on_service_irq(&self) {
        debug_assert!(
            self.service.is_owner_core(),
            "service irq must run on the owner core"
        );
        let me = self.service.caller();
        match self.service.mutex.try_enter(me) {
            Some(1) => {
                self.in_service_irq.store(true, Ordering::Relaxed);
                let ran = self.slots.drain(self);
                self.in_service_irq.store(false, Ordering::Relaxed);
                if ran > 0 {
                    self.service.stats.inc(Stat::DispatchRun);
                }
                self.service.unlock();
            }
            Some(_) => {
                // Interrupted our own critical section; thread_exit re-arms
                self.dispatch_missed.store(true, Ordering::Release);
                self.service.stats.inc(Stat::DispatchDeferred);
                self.service.unlock();
            }
            None => {
                self.dispatch_missed.store(true, Ordering::Release);
                self.service.stats.inc(Stat::DispatchDeferred);
            }
        }
        self.service.work.release(self.platform());
    }

    /// Wake IRQ handler (driver host-wake line, or forced by another core).
    pub fn on_wake_irq(&self) {
        let platform = self.platform();
        // Level-triggered: keep it masked until the driver poll re-enables it
        platform.set_wake_irq_enabled(false);
        platform.clear_wake_irq(platform.core_id());
        self.service.stats.inc(Stat::WakeIrq);
        self.schedule(Slot::Driver, Self::driver_poll);
    }

    /// Repeating alarm handler. Returns the interval until the next alarm.
    pub fn on_periodic_alarm(&self) -> Duration {
        self.schedule(Slot::Adapter, Self::periodic_worker);
        self.service.service_interval()
    }

    fn driver_poll(arch: &Self) {
        arch.service.poll_driver();
        arch.post_poll_hook();
    }

    fn periodic_worker(arch: &Self) {
        if arch.service.periodic_work() {
            arch.schedule(Slot::Driver, Self::driver_poll);
        }
    }

    // ========================================================================
    // Critical section
    // ========================================================================

    /// Enter the critical section, blocking until available. Re-entrant.
    pub fn thread_enter(&self) {
        self.service.lock();
    }

    /// Leave one critical-section level.
    ///
    /// Leaving the outermost level re-arms dispatch for anything scheduled
    /// while the lock was held, before the lock is released. A service IRQ
    /// that misses between that check and the release is re-armed once the
    /// lock is free.
    pub fn thread_exit(&self) {
        if self.service.is_outermost() {
            // The service IRQ releases its level directly, never through here
            debug_assert!(!self.in_service_irq.load(Ordering::Relaxed));
            if self.slots.any_pending() {
                self.dispatch_missed.store(false, Ordering::Release);
                self.kick();
            }
        }
        let remaining = self.service.unlock();
        if remaining == 0
            && self.dispatch_missed.swap(false, Ordering::AcqRel)
            && self.slots.any_pending()
        {
            self.kick();
        }
    }

    /// Panic unless the caller holds the critical section (debug builds only).
    pub fn thread_lock_check(&self) {
        self.service.lock_check();
    }

    fn with_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        self.thread_enter();
        let r = f();
        self.thread_exit();
        r
    }
}

impl<P, D, N, C> Arch for BackgroundArch<P, D, N, C>
where
    P: BackgroundPlatform,
    D: UsbDriver,
    N: NetStack,
    C: ArchConfig,
{
    const MODE: Mode = Mode::ThreadsafeBackground;

    fn init(&self) -> Result<(), ArchError> {
        self.slots.clear();
        self.dispatch_missed.store(false, Ordering::Relaxed);
        let core = self.service.start()?;

        let interval = self.service.service_interval();
        let alarm = self.platform().start_periodic(interval).map_err(|_| {
            error!("no alarm available for periodic servicing");
            ArchError::Generic
        })?;
        critical_section::with(|cs| self.alarm.borrow(cs).set(Some(alarm)));

        self.service.start_net();
        info!("background arch up on core {}", core.0);
        Ok(())
    }

    fn deinit(&self) {
        let core = self.platform().core_id();
        if core != self.owner_core() {
            panic!("deinit must be called from the core that called init");
        }
        if let Some(alarm) = critical_section::with(|cs| self.alarm.borrow(cs).take()) {
            self.platform().cancel(alarm);
        }
        self.with_lock(|| self.service.driver.deinit());
        self.slots.clear();
        info!("background arch down");
    }

    fn now(&self) -> Instant {
        self.platform().now()
    }

    fn service_interval(&self) -> Duration {
        self.service.service_interval()
    }

    fn poll(&self) {}

    fn wait_for_work_until(&self, deadline: Deadline) {
        // Only ever called from polling loops; never block an interrupt
        if !self.platform().in_interrupt() {
            self.service.work.acquire_until(self.platform(), deadline);
        }
    }

    fn connect_async(&self) -> Result<(), ArchError> {
        self.with_lock(|| self.service.driver.connect_async())
    }

    fn link_status(&self) -> LinkStatus {
        self.with_lock(|| self.service.driver.link_status())
    }

    fn lwip_begin(&self) {
        self.thread_enter();
    }

    fn lwip_end(&self) {
        self.thread_exit();
    }

    fn lwip_check(&self) {
        self.thread_lock_check();
    }
}

impl<P, D, N, C> DriverPort for BackgroundArch<P, D, N, C>
where
    P: BackgroundPlatform,
    D: UsbDriver,
    N: NetStack,
    C: ArchConfig,
{
    fn schedule_internal_poll(&self) {
        self.schedule(Slot::Driver, Self::driver_poll);
    }

    fn thread_enter(&self) {
        BackgroundArch::thread_enter(self);
    }

    fn thread_exit(&self) {
        BackgroundArch::thread_exit(self);
    }

    fn thread_lock_check(&self) {
        BackgroundArch::thread_lock_check(self);
    }

    fn post_poll_hook(&self) {
        self.platform().set_wake_irq_enabled(true);
    }

    fn delay(&self, duration: Duration) {
        self.service.delay(duration);
    }

    fn request_poll(&self) {
        self.schedule_internal_poll();
    }

    fn set_sleep(&self, ticks: u32) {
        self.service.set_sleep(ticks);
    }

    fn mac_address(&self) -> MacAddress {
        self.service.mac_address()
    }
}

impl<P, D, N, C> core::fmt::Debug for BackgroundArch<P, D, N, C>
where
    P: BackgroundPlatform,
    D: UsbDriver,
    N: NetStack,
    C: ArchConfig,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackgroundArch")
            .field("owner_core", &self.owner_core())
            .field("lock", &self.service.mutex)
            .field("slots", &self.slots)
            .field("sleep", &self.sleep())
            .finish_non_exhaustive()
    }
}
