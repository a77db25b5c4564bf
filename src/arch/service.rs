//! State and routines shared by every arch mode.

use core::marker::PhantomData;

use portable_atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::config::{self, ArchConfig};
use crate::driver::{NetStack, UsbDriver};
use crate::error::ArchError;
use crate::mac::MacAddress;
use crate::platform::{CoreId, OwnerId, Platform};
use crate::stats::{Stat, Stats};
use crate::sync::{RecursiveMutex, WorkSignal};
use crate::time::{Deadline, Duration};

/// Driver, network stack and the bookkeeping around them.
///
/// Owned by exactly one arch instance; the instance decides which context
/// may call which routine.
pub(crate) struct Service<P, D, N, C> {
    pub(crate) platform: P,
    pub(crate) driver: D,
    pub(crate) net: N,
    pub(crate) mutex: RecursiveMutex,
    pub(crate) work: WorkSignal,
    pub(crate) stats: Stats,
    owner_core: AtomicU8,
    sleep: AtomicU32,
    worker_runs: AtomicU32,
    net_ready: AtomicBool,
    _config: PhantomData<C>,
}

impl<P, D, N, C> Service<P, D, N, C>
where
    P: Platform,
    D: UsbDriver,
    N: NetStack,
    C: ArchConfig,
{
    pub(crate) const fn new(platform: P, driver: D, net: N) -> Self {
        Self {
            platform,
            driver,
            net,
            mutex: RecursiveMutex::new(),
            work: WorkSignal::new(),
            stats: Stats::new(),
            owner_core: AtomicU8::new(0),
            sleep: AtomicU32::new(0),
            worker_runs: AtomicU32::new(0),
            net_ready: AtomicBool::new(false),
            _config: PhantomData,
        }
    }

    /// Record the calling core as owner and bring up board and driver.
    pub(crate) fn start(&self) -> Result<CoreId, ArchError> {
        let core = self.platform.core_id();
        self.owner_core.store(core.0, Ordering::Release);
        self.mutex.reset();
        self.work.reset();
        self.sleep.store(0, Ordering::Relaxed);

        self.platform.board_init();
        self.driver.init().inspect_err(|e| {
            error!("driver init failed: {}", e.code());
        })?;
        Ok(core)
    }

    /// Initialize the network stack the first time only.
    pub(crate) fn start_net(&self) {
        if !self.net_ready.swap(true, Ordering::AcqRel) {
            self.net.init(C::HOST_NAME);
        }
    }

    pub(crate) fn owner_core(&self) -> CoreId {
        CoreId(self.owner_core.load(Ordering::Acquire))
    }

    pub(crate) fn is_owner_core(&self) -> bool {
        self.platform.core_id() == self.owner_core()
    }

    pub(crate) fn caller(&self) -> OwnerId {
        self.platform.lock_owner_id()
    }

    pub(crate) fn service_interval(&self) -> Duration {
        Duration::millis(C::SLEEP_CHECK_MS as u64)
    }

    // ------------------------------------------------------------------
    // Critical section
    // ------------------------------------------------------------------

    pub(crate) fn lock(&self) -> u32 {
        let me = self.caller();
        self.mutex
            .enter_blocking(me, || self.platform.wait_for_event_until(Deadline::Never))
    }

    pub(crate) fn unlock(&self) -> u32 {
        let remaining = self.mutex.exit(self.caller());
        if remaining == 0 {
            self.platform.send_event();
        }
        remaining
    }

    /// Whether the caller is in its outermost critical-section level.
    pub(crate) fn is_outermost(&self) -> bool {
        self.mutex.enter_count() == 1 && self.mutex.is_held_by(self.caller())
    }

    pub(crate) fn lock_check(&self) {
        if cfg!(debug_assertions) && !self.mutex.is_held_by(self.caller()) {
            panic!("thread lock check failed: critical section not held by caller");
        }
    }

    // ------------------------------------------------------------------
    // Servicing
    // ------------------------------------------------------------------

    pub(crate) fn poll_driver(&self) {
        self.stats.inc(Stat::DriverPoll);
        self.driver.poll();
    }

    pub(crate) fn run_net_timeouts(&self) {
        self.stats.inc(Stat::NetRun);
        self.net.check_timeouts();
    }

    /// One periodic worker pass. Returns `true` when the driver poll is due.
    pub(crate) fn periodic_work(&self) -> bool {
        if C::USE_STATS {
            let runs = self.worker_runs.fetch_add(1, Ordering::Relaxed);
            if runs % config::stats_dump_every::<C>() == 0 {
                self.stats.dump();
            }
        }

        self.run_net_timeouts();
        self.driver.has_poll() && self.tick_sleep()
    }

    pub(crate) fn set_sleep(&self, ticks: u32) {
        self.sleep.store(ticks, Ordering::Release);
    }

    pub(crate) fn sleep(&self) -> u32 {
        self.sleep.load(Ordering::Acquire)
    }

    /// Age the sleep counter by one tick. Returns `true` when it hits zero.
    pub(crate) fn tick_sleep(&self) -> bool {
        matches!(
            self.sleep
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| s.checked_sub(1)),
            Ok(1)
        )
    }

    pub(crate) fn delay(&self, duration: Duration) {
        let until = self.platform.now() + duration;
        // Sleeping is not possible inside an interrupt
        if self.platform.in_interrupt() {
            self.platform.busy_wait_until(until);
        } else {
            self.platform.sleep_until(until);
        }
    }

    pub(crate) fn mac_address(&self) -> MacAddress {
        if C::USE_OTP_MAC
            && let Some(mac) = self.driver.otp_mac()
        {
            return mac;
        }
        warn!("no MAC in OTP, deriving one from the board id");
        MacAddress::from_board_id(&self.platform.unique_board_id())
    }
}
