//! Test fixtures for tusb-arch testing.
//!
//! Provides:
//! - `MockPlatform`: simulated dual-core board (clock, cores, IRQ lines,
//!   alarms, task signals)
//! - `MockDriver`: scripted USB network driver
//! - `MockNet`: recording network stack
//!
//! Tests are single threaded, so interior state uses `Cell`/`RefCell`.
//! "Running on core 1" or "running in an interrupt" is simulated by switching
//! the platform's current context.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use tusb_arch::platform::{
    AlarmId, AlarmPool, BoardId, Clock, CoreId, Cores, IrqLines, OwnerId, TaskSignal,
};
use tusb_arch::{ArchError, Deadline, Duration, Instant, LinkStatus, MacAddress, NetStack, UsbDriver};

/// Board id used by every mock platform.
pub const TEST_BOARD_ID: BoardId = [0xE6, 0x60, 0x41, 0x30, 0x23, 0x45, 0x67, 0x89];

/// How far a wait with no deadline moves the simulated clock.
pub const IDLE_WAIT_US: u64 = 1_000;

// ============================================================================
// MockPlatform - Simulated Board
// ============================================================================

/// Simulated board.
///
/// The clock only moves when something waits or sleeps, or when a test
/// calls [`MockPlatform::advance_us`].
#[derive(Debug)]
pub struct MockPlatform {
    now: Cell<u64>,

    // Execution context
    core: Cell<u8>,
    task: Cell<Option<u32>>,
    in_irq: Cell<bool>,

    // Clock activity
    pub waits: Cell<u32>,
    pub events: Cell<u32>,
    pub sleeps: RefCell<Vec<u64>>,
    pub busy_waits: RefCell<Vec<u64>>,

    // Board
    pub board_inits: Cell<u32>,

    // Interrupt lines
    pub service_pends: RefCell<VecDeque<CoreId>>,
    pub forced_wakes: RefCell<VecDeque<CoreId>>,
    pub cleared_wakes: RefCell<Vec<CoreId>>,
    pub wake_enabled: Cell<bool>,

    // Alarms
    pub fail_alarm: Cell<bool>,
    pub alarms: RefCell<Vec<Duration>>,
    pub cancelled: RefCell<Vec<AlarmId>>,

    // Task signal
    pub notified: Cell<bool>,
    pub notifies: Cell<u32>,

    // Interleaving
    owner_queries: Cell<u32>,
    owner_hook: RefCell<Option<OwnerHook>>,
}

/// One-shot callback run from inside `lock_owner_id`.
pub struct OwnerHook(Box<dyn FnOnce()>);

impl core::fmt::Debug for OwnerHook {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("OwnerHook")
    }
}

impl MockPlatform {
    /// Board at t=0, running on core 0 in thread context.
    pub fn new() -> Self {
        Self {
            now: Cell::new(0),
            core: Cell::new(0),
            task: Cell::new(None),
            in_irq: Cell::new(false),
            waits: Cell::new(0),
            events: Cell::new(0),
            sleeps: RefCell::new(Vec::new()),
            busy_waits: RefCell::new(Vec::new()),
            board_inits: Cell::new(0),
            service_pends: RefCell::new(VecDeque::new()),
            forced_wakes: RefCell::new(VecDeque::new()),
            cleared_wakes: RefCell::new(Vec::new()),
            wake_enabled: Cell::new(true),
            fail_alarm: Cell::new(false),
            alarms: RefCell::new(Vec::new()),
            cancelled: RefCell::new(Vec::new()),
            notified: Cell::new(false),
            notifies: Cell::new(0),
            owner_queries: Cell::new(0),
            owner_hook: RefCell::new(None),
        }
    }

    /// Current simulated time in µs.
    pub fn now_us(&self) -> u64 {
        self.now.get()
    }

    /// Move the clock forward.
    pub fn advance_us(&self, us: u64) {
        self.now.set(self.now.get() + us);
    }

    /// Set the clock.
    pub fn set_now_us(&self, us: u64) {
        self.now.set(us);
    }

    /// Switch the simulated core.
    pub fn set_core(&self, core: u8) {
        self.core.set(core);
    }

    /// Switch the simulated RTOS task (`None` = lock identity is the core).
    pub fn set_task(&self, task: Option<u32>) {
        self.task.set(task);
    }

    /// Enter or leave simulated interrupt context.
    pub fn set_in_irq(&self, in_irq: bool) {
        self.in_irq.set(in_irq);
    }

    /// Run `f` on `core`, optionally in interrupt context, then restore the
    /// previous context.
    pub fn on_core<R>(&self, core: u8, in_irq: bool, f: impl FnOnce() -> R) -> R {
        let prev_core = self.core.replace(core);
        let prev_irq = self.in_irq.replace(in_irq);
        let r = f();
        self.core.set(prev_core);
        self.in_irq.set(prev_irq);
        r
    }

    /// Run `f` as RTOS task `task`, then restore the previous task.
    pub fn as_task<R>(&self, task: u32, f: impl FnOnce() -> R) -> R {
        let prev = self.task.replace(Some(task));
        let r = f();
        self.task.set(prev);
        r
    }

    /// Run `f` during the `after`-th lock owner query from now, before that
    /// query returns.
    ///
    /// Lets a test interleave another core's work at a precise point inside
    /// a lock operation. Queries made by `f` itself do not count.
    pub fn on_owner_query(&self, after: u32, f: impl FnOnce() + 'static) {
        self.owner_queries.set(after);
        *self.owner_hook.borrow_mut() = Some(OwnerHook(Box::new(f)));
    }

    fn move_to(&self, until: u64) {
        if until > self.now.get() {
            self.now.set(until);
        }
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockPlatform {
    fn now(&self) -> Instant {
        Instant::from_ticks(self.now.get())
    }

    fn wait_for_event_until(&self, deadline: Deadline) {
        self.waits.set(self.waits.get() + 1);
        match deadline {
            Deadline::At(at) => self.move_to(at.ticks()),
            Deadline::Never => self.advance_us(IDLE_WAIT_US),
        }
    }

    fn send_event(&self) {
        self.events.set(self.events.get() + 1);
    }

    fn sleep_until(&self, until: Instant) {
        self.sleeps.borrow_mut().push(until.ticks());
        self.move_to(until.ticks());
    }

    fn busy_wait_until(&self, until: Instant) {
        self.busy_waits.borrow_mut().push(until.ticks());
        self.move_to(until.ticks());
    }
}

impl Cores for MockPlatform {
    fn core_id(&self) -> CoreId {
        CoreId(self.core.get())
    }

    fn lock_owner_id(&self) -> OwnerId {
        let id = match self.task.get() {
            Some(task) => OwnerId(task),
            None => OwnerId::from(self.core_id()),
        };
        let left = self.owner_queries.get();
        if left > 0 {
            self.owner_queries.set(left - 1);
            if left == 1 {
                let hook = self.owner_hook.borrow_mut().take();
                if let Some(OwnerHook(f)) = hook {
                    f();
                }
            }
        }
        id
    }

    fn in_interrupt(&self) -> bool {
        self.in_irq.get()
    }

    fn unique_board_id(&self) -> BoardId {
        TEST_BOARD_ID
    }

    fn board_init(&self) {
        self.board_inits.set(self.board_inits.get() + 1);
    }
}

impl IrqLines for MockPlatform {
    fn pend_service_irq(&self) {
        self.service_pends.borrow_mut().push_back(self.core_id());
    }

    fn force_wake_irq(&self, core: CoreId) {
        self.forced_wakes.borrow_mut().push_back(core);
    }

    fn clear_wake_irq(&self, core: CoreId) {
        self.cleared_wakes.borrow_mut().push(core);
    }

    fn set_wake_irq_enabled(&self, enabled: bool) {
        self.wake_enabled.set(enabled);
    }
}

impl AlarmPool for MockPlatform {
    fn start_periodic(&self, interval: Duration) -> Result<AlarmId, ArchError> {
        if self.fail_alarm.get() {
            return Err(ArchError::Generic);
        }
        let mut alarms = self.alarms.borrow_mut();
        alarms.push(interval);
        Ok(AlarmId(alarms.len() as u32))
    }

    fn cancel(&self, id: AlarmId) {
        self.cancelled.borrow_mut().push(id);
    }
}

impl TaskSignal for MockPlatform {
    fn notify_service(&self) {
        self.notifies.set(self.notifies.get() + 1);
        self.notified.set(true);
    }

    fn wait_service_notify(&self, deadline: Deadline) -> bool {
        if self.notified.replace(false) {
            return true;
        }
        self.wait_for_event_until(deadline);
        false
    }
}

// ============================================================================
// MockDriver - Scripted USB Driver
// ============================================================================

/// Scripted USB network driver.
///
/// `link_status` pops the next scripted status; once the script runs out the
/// last status sticks.
#[derive(Debug)]
pub struct MockDriver {
    pub init_result: Cell<Result<(), ArchError>>,
    pub connect_result: Cell<Result<(), ArchError>>,
    pub has_poll: Cell<bool>,
    pub otp: Cell<Option<MacAddress>>,

    pub inits: Cell<u32>,
    pub deinits: Cell<u32>,
    pub polls: Cell<u32>,
    pub connects: Cell<u32>,
    pub status_reads: Cell<u32>,

    script: RefCell<VecDeque<LinkStatus>>,
    status: Cell<LinkStatus>,
}

impl MockDriver {
    /// Driver that initializes fine, has a poll routine and stays down.
    pub fn new() -> Self {
        Self {
            init_result: Cell::new(Ok(())),
            connect_result: Cell::new(Ok(())),
            has_poll: Cell::new(true),
            otp: Cell::new(None),
            inits: Cell::new(0),
            deinits: Cell::new(0),
            polls: Cell::new(0),
            connects: Cell::new(0),
            status_reads: Cell::new(0),
            script: RefCell::new(VecDeque::new()),
            status: Cell::new(LinkStatus::Down),
        }
    }

    /// Driver reporting `statuses` in order, one per status read.
    pub fn with_script(statuses: &[LinkStatus]) -> Self {
        let driver = Self::new();
        driver.script.borrow_mut().extend(statuses.iter().copied());
        driver
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbDriver for MockDriver {
    fn init(&self) -> Result<(), ArchError> {
        self.inits.set(self.inits.get() + 1);
        self.init_result.get()
    }

    fn deinit(&self) {
        self.deinits.set(self.deinits.get() + 1);
    }

    fn has_poll(&self) -> bool {
        self.has_poll.get()
    }

    fn poll(&self) {
        self.polls.set(self.polls.get() + 1);
    }

    fn connect_async(&self) -> Result<(), ArchError> {
        self.connects.set(self.connects.get() + 1);
        self.connect_result.get()
    }

    fn link_status(&self) -> LinkStatus {
        self.status_reads.set(self.status_reads.get() + 1);
        if let Some(next) = self.script.borrow_mut().pop_front() {
            self.status.set(next);
        }
        self.status.get()
    }

    fn otp_mac(&self) -> Option<MacAddress> {
        self.otp.get()
    }
}

// ============================================================================
// MockNet - Recording Network Stack
// ============================================================================

/// Network stack that records calls.
#[derive(Debug, Default)]
pub struct MockNet {
    pub hostname: RefCell<Option<String>>,
    pub inits: Cell<u32>,
    pub timeouts: Cell<u32>,
    pub links: RefCell<Vec<(usize, bool)>>,
    pub frames: RefCell<Vec<Vec<u8>>>,
}

impl MockNet {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NetStack for MockNet {
    fn init(&self, hostname: &str) {
        self.inits.set(self.inits.get() + 1);
        *self.hostname.borrow_mut() = Some(hostname.to_string());
    }

    fn check_timeouts(&self) {
        self.timeouts.set(self.timeouts.get() + 1);
    }

    fn set_link_up(&self, itf: usize) {
        self.links.borrow_mut().push((itf, true));
    }

    fn set_link_down(&self, itf: usize) {
        self.links.borrow_mut().push((itf, false));
    }

    fn process_frame(&self, _itf: usize, frame: &[u8]) {
        self.frames.borrow_mut().push(frame.to_vec());
    }
}
