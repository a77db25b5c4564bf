//! Polling mode.
//!
//! Not multi-core or IRQ safe. The application calls [`Arch::poll`] from its
//! main loop; everything runs synchronously in that context. The network
//! stack lock calls are no-ops, but debug builds still check that the stack
//! is only touched from the init core outside interrupts.

use portable_atomic::{AtomicBool, AtomicU64, Ordering};

use crate::arch::service::Service;
use crate::arch::{Arch, DriverPort, Mode};
use crate::config::{ArchConfig, DefaultConfig};
use crate::driver::{LinkStatus, NetStack, NoNetStack, UsbDriver};
use crate::error::ArchError;
use crate::mac::MacAddress;
use crate::platform::{CoreId, Platform};
use crate::stats::Stats;
use crate::time::{Deadline, Duration, Instant};

/// Polling arch.
pub struct PollArch<P, D, N = NoNetStack, C = DefaultConfig> {
    service: Service<P, D, N, C>,
    poll_required: AtomicBool,
    last_sleep_tick: AtomicU64,
}

impl<P, D, N, C> PollArch<P, D, N, C>
where
    P: Platform,
    D: UsbDriver,
    N: NetStack,
    C: ArchConfig,
{
    /// Create an uninitialized instance. Call [`Arch::init`] before use.
    pub const fn new(platform: P, driver: D, net: N) -> Self {
        Self {
            service: Service::new(platform, driver, net),
            poll_required: AtomicBool::new(false),
            last_sleep_tick: AtomicU64::new(0),
        }
    }

    /// Platform handle.
    pub fn platform(&self) -> &P {
        &self.service.platform
    }

    /// Driver handle.
    pub fn driver(&self) -> &D {
        &self.service.driver
    }

    /// Network stack handle.
    pub fn net(&self) -> &N {
        &self.service.net
    }

    /// Service counters.
    pub fn stats(&self) -> &Stats {
        &self.service.stats
    }

    /// Core that called `init`.
    pub fn init_core(&self) -> CoreId {
        self.service.owner_core()
    }

    /// Current sleep countdown.
    pub fn sleep(&self) -> u32 {
        self.service.sleep()
    }

    /// Whether the driver asked to be polled.
    pub fn poll_required(&self) -> bool {
        self.poll_required.load(Ordering::Acquire)
    }

    /// Panic when called from an interrupt or from a core other than the
    /// init core (debug builds only).
    pub fn thread_check(&self) {
        if cfg!(debug_assertions)
            && (self.platform().in_interrupt() || !self.service.is_owner_core())
        {
            panic!("thread check failed: network stack used outside the init context");
        }
    }

    /// Age the sleep counter, at most one tick per `POLL_SLEEP_TICK_US`
    /// however often `poll` is called.
    fn age_sleep(&self) {
        if self.service.sleep() == 0 {
            return;
        }
        let now = self.platform().now().ticks();
        let last = self.last_sleep_tick.load(Ordering::Relaxed);
        if now.saturating_sub(last) > C::POLL_SLEEP_TICK_US {
            if self.service.tick_sleep() {
                self.poll_required.store(true, Ordering::Release);
            }
            self.last_sleep_tick.store(now, Ordering::Relaxed);
        }
    }
}

impl<P, D, N, C> Arch for PollArch<P, D, N, C>
where
    P: Platform,
    D: UsbDriver,
    N: NetStack,
    C: ArchConfig,
{
    const MODE: Mode = Mode::Poll;

    fn init(&self) -> Result<(), ArchError> {
        let core = self.service.start()?;
        self.poll_required.store(false, Ordering::Relaxed);
        self.service.start_net();
        info!("poll arch up on core {}", core.0);
        Ok(())
    }

    fn deinit(&self) {
        if !self.service.is_owner_core() {
            panic!("deinit must be called from the core that called init");
        }
        self.service.driver.deinit();
        info!("poll arch down");
    }

    fn now(&self) -> Instant {
        self.platform().now()
    }

    fn service_interval(&self) -> Duration {
        self.service.service_interval()
    }

    fn poll(&self) {
        self.service.run_net_timeouts();
        if self.service.driver.has_poll() {
            self.age_sleep();
            // Unconditional, the caller throttles. Requests made during the
            // poll stay set.
            self.poll_required.store(false, Ordering::Release);
            self.service.poll_driver();
        }
    }

    fn wait_for_work_until(&self, deadline: Deadline) {
        self.platform().wait_for_event_until(deadline);
    }

    fn connect_async(&self) -> Result<(), ArchError> {
        self.service.driver.connect_async()
    }

    fn link_status(&self) -> LinkStatus {
        self.service.driver.link_status()
    }

    fn lwip_begin(&self) {}

    fn lwip_end(&self) {}

    fn lwip_check(&self) {
        self.thread_check();
    }
}

impl<P, D, N, C> DriverPort for PollArch<P, D, N, C>
where
    P: Platform,
    D: UsbDriver,
    N: NetStack,
    C: ArchConfig,
{
    fn schedule_internal_poll(&self) {
        self.poll_required.store(true, Ordering::Release);
    }

    fn thread_enter(&self) {}

    fn thread_exit(&self) {}

    fn thread_lock_check(&self) {
        self.thread_check();
    }

    fn post_poll_hook(&self) {}

    fn delay(&self, duration: Duration) {
        self.service.delay(duration);
    }

    fn request_poll(&self) {
        self.poll_required.store(true, Ordering::Release);
    }

    fn set_sleep(&self, ticks: u32) {
        self.service.set_sleep(ticks);
    }

    fn mac_address(&self) -> MacAddress {
        self.service.mac_address()
    }
}

impl<P, D, N, C> core::fmt::Debug for PollArch<P, D, N, C>
where
    P: Platform,
    D: UsbDriver,
    N: NetStack,
    C: ArchConfig,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PollArch")
            .field("init_core", &self.init_core())
            .field("poll_required", &self.poll_required())
            .field("sleep", &self.sleep())
            .finish_non_exhaustive()
    }
}
