//! Shared test helpers to reduce duplication across integration tests.

#![allow(dead_code)]

#[allow(clippy::duplicate_mod)]
#[path = "fixtures/mod.rs"]
mod fixtures;

pub use fixtures::*;

use tusb_arch::config::DefaultConfig;
use tusb_arch::{Arch, BackgroundArch, PollArch, RtosArch};

/// Background arch over the mocks.
pub type TestBackground<C = DefaultConfig> = BackgroundArch<MockPlatform, MockDriver, MockNet, C>;

/// Poll arch over the mocks.
pub type TestPoll<C = DefaultConfig> = PollArch<MockPlatform, MockDriver, MockNet, C>;

/// RTOS arch over the mocks.
pub type TestRtos<C = DefaultConfig> = RtosArch<MockPlatform, MockDriver, MockNet, C>;

// ============================================================================
// Arch Creation Helpers
// ============================================================================

/// Background arch initialized on core 0.
pub fn create_background() -> TestBackground {
    create_background_with(MockDriver::new())
}

/// Background arch with a custom driver, initialized on core 0.
pub fn create_background_with(driver: MockDriver) -> TestBackground {
    let arch: TestBackground = TestBackground::new(MockPlatform::new(), driver, MockNet::new());
    arch.init().unwrap();
    arch
}

/// Poll arch initialized on core 0.
pub fn create_poll() -> TestPoll {
    create_poll_with(MockDriver::new())
}

/// Poll arch with a custom driver, initialized on core 0.
pub fn create_poll_with(driver: MockDriver) -> TestPoll {
    let arch: TestPoll = TestPoll::new(MockPlatform::new(), driver, MockNet::new());
    arch.init().unwrap();
    arch
}

/// Init task id used by RTOS tests.
pub const INIT_TASK: u32 = 7;

/// Service task id used by RTOS tests.
pub const SERVICE_TASK: u32 = 9;

/// RTOS arch initialized from [`INIT_TASK`].
pub fn create_rtos() -> TestRtos {
    let arch: TestRtos = TestRtos::new(MockPlatform::new(), MockDriver::new(), MockNet::new());
    arch.platform().set_task(Some(INIT_TASK));
    arch.init().unwrap();
    arch
}

// ============================================================================
// Interrupt Simulation
// ============================================================================

/// Deliver pending wake and service IRQs until none are left.
///
/// Each IRQ runs in interrupt context on the core it was raised for. Returns
/// how many IRQs were delivered.
pub fn fire_irqs<C: tusb_arch::ArchConfig>(arch: &TestBackground<C>) -> usize {
    let mut fired = 0;
    loop {
        let wake = arch.platform().forced_wakes.borrow_mut().pop_front();
        if let Some(core) = wake {
            arch.platform().on_core(core.0, true, || arch.on_wake_irq());
            fired += 1;
            continue;
        }

        let service = arch.platform().service_pends.borrow_mut().pop_front();
        if let Some(core) = service {
            arch.platform().on_core(core.0, true, || arch.on_service_irq());
            fired += 1;
            continue;
        }

        return fired;
    }
}

/// Fire the periodic alarm on the owner core and deliver the IRQs it causes.
pub fn fire_alarm<C: tusb_arch::ArchConfig>(arch: &TestBackground<C>) -> usize {
    let owner = arch.owner_core().0;
    arch.platform().on_core(owner, true, || arch.on_periodic_alarm());
    fire_irqs(arch)
}
