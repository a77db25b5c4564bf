//! RTOS mode.
//!
//! Same dispatch table and recursive mutex as the background mode, but
//! deferred work runs in a dedicated service task instead of an IRQ. The
//! application spawns a task that calls [`RtosArch::run_service_task`].
//! Scheduling from any task, core or interrupt notifies that task; the task's
//! wait timeout stands in for the periodic alarm.
//!
//! Lock identities are task handles, so `init`/`deinit` pairing is checked per
//! task rather than per core.

use portable_atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crate::arch::service::Service;
use crate::arch::{Arch, DriverPort, Mode};
use crate::config::{ArchConfig, DefaultConfig};
use crate::dispatch::{DispatchFn, DispatchTable, Slot};
use crate::driver::{LinkStatus, NetStack, NoNetStack, UsbDriver};
use crate::error::ArchError;
use crate::mac::MacAddress;
use crate::platform::{OwnerId, RtosPlatform};
use crate::stats::{Stat, Stats};
use crate::time::{Deadline, Duration, Instant};

/// RTOS arch.
pub struct RtosArch<P, D, N = NoNetStack, C = DefaultConfig> {
    service: Service<P, D, N, C>,
    slots: DispatchTable<RtosArch<P, D, N, C>, { Slot::COUNT }>,
    init_owner: AtomicU32,
    running: AtomicBool,
    next_tick: AtomicU64,
}

impl<P, D, N, C> RtosArch<P, D, N, C>
where
    P: RtosPlatform,
    D: UsbDriver,
    N: NetStack,
    C: ArchConfig,
{
    /// Create an uninitialized instance. Call [`Arch::init`] before use.
    pub const fn new(platform: P, driver: D, net: N) -> Self {
        Self {
            service: Service::new(platform, driver, net),
            slots: DispatchTable::new(),
            init_owner: AtomicU32::new(0),
            running: AtomicBool::new(false),
            next_tick: AtomicU64::new(0),
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

    /// Current sleep countdown.
    pub fn sleep(&self) -> u32 {
        self.service.sleep()
    }

    /// Whether the service task should keep running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether `slot` has a callback waiting.
    pub fn is_pending(&self, slot: Slot) -> bool {
        self.slots.is_pending(slot.index())
    }

    /// Run `f` later in the service task, replacing any callback waiting in
    /// `slot`.
    pub fn schedule(&self, slot: Slot, f: DispatchFn<Self>) {
        self.slots.set(slot.index(), f);
        self.platform().notify_service();
    }

    /// Service task body. Returns after [`Arch::deinit`].
    pub fn run_service_task(&self) {
        while self.service_task_step() {}
    }

    /// One service task iteration: wait for a notification or the periodic
    /// tick, then drain the slot table under the lock.
    ///
    /// Returns `false` once the arch has been shut down.
    pub fn service_task_step(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        let next = Instant::from_ticks(self.next_tick.load(Ordering::Acquire));
        self.platform().wait_service_notify(Deadline::At(next));
        if !self.is_running() {
            return false;
        }

        let now = self.platform().now();
        if now.ticks() >= next.ticks() {
            self.slots.set(Slot::Adapter.index(), Self::periodic_worker);
            let next = now + self.service.service_interval();
            self.next_tick.store(next.ticks(), Ordering::Release);
        }

        // Tasks may block, so wait for the lock instead of deferring
        self.thread_enter();
        if self.slots.any_pending() {
            self.service.stats.inc(Stat::DispatchRun);
            self.slots.drain(self);
        }
        self.thread_exit();

        self.service.work.release(self.platform());
        true
    }

    fn driver_poll(arch: &Self) {
        arch.service.poll_driver();
    }

    fn periodic_worker(arch: &Self) {
        if arch.service.periodic_work() {
            arch.schedule(Slot::Driver, Self::driver_poll);
        }
    }

    /// Enter the critical section, blocking until available. Re-entrant.
    pub fn thread_enter(&self) {
        self.service.lock();
    }

    /// Leave one critical-section level, notifying the service task on the
    /// outermost exit if work was scheduled meanwhile.
    pub fn thread_exit(&self) {
        if self.service.is_outermost() && self.slots.any_pending() {
            self.platform().notify_service();
        }
        self.service.unlock();
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

impl<P, D, N, C> Arch for RtosArch<P, D, N, C>
where
    P: RtosPlatform,
    D: UsbDriver,
    N: NetStack,
    C: ArchConfig,
{
    const MODE: Mode = Mode::Rtos;

    fn init(&self) -> Result<(), ArchError> {
        self.slots.clear();
        self.init_owner
            .store(self.service.caller().0, Ordering::Release);
        self.service.start()?;

        let first_tick = self.platform().now() + self.service.service_interval();
        self.next_tick.store(first_tick.ticks(), Ordering::Release);
        self.running.store(true, Ordering::Release);

        self.service.start_net();
        info!("rtos arch up");
        Ok(())
    }

    fn deinit(&self) {
        let me = self.service.caller();
        if me != OwnerId(self.init_owner.load(Ordering::Acquire)) {
            panic!("deinit must be called from the task that called init");
        }
        self.running.store(false, Ordering::Release);
        self.platform().notify_service();
        self.with_lock(|| self.service.driver.deinit());
        self.slots.clear();
        info!("rtos arch down");
    }

    fn now(&self) -> Instant {
        self.platform().now()
    }

    fn service_interval(&self) -> Duration {
        self.service.service_interval()
    }

    fn poll(&self) {}

    fn wait_for_work_until(&self, deadline: Deadline) {
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

impl<P, D, N, C> DriverPort for RtosArch<P, D, N, C>
where
    P: RtosPlatform,
    D: UsbDriver,
    N: NetStack,
    C: ArchConfig,
{
    fn schedule_internal_poll(&self) {
        self.schedule(Slot::Driver, Self::driver_poll);
    }

    fn thread_enter(&self) {
        RtosArch::thread_enter(self);
    }

    fn thread_exit(&self) {
        RtosArch::thread_exit(self);
    }

    fn thread_lock_check(&self) {
        RtosArch::thread_lock_check(self);
    }

    fn post_poll_hook(&self) {}

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

impl<P, D, N, C> core::fmt::Debug for RtosArch<P, D, N, C>
where
    P: RtosPlatform,
    D: UsbDriver,
    N: NetStack,
    C: ArchConfig,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RtosArch")
            .field("running", &self.is_running())
            .field("lock", &self.service.mutex)
            .field("slots", &self.slots)
            .field("sleep", &self.sleep())
            .finish_non_exhaustive()
    }
}
