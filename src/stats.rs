//! Service counters.
//!
//! Counting is cheap and always compiled; `ArchConfig::USE_STATS` only
//! controls the periodic dump to the log.

use portable_atomic::{AtomicU32, Ordering};

/// Counter identifiers.
#[repr(usize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stat {
    /// Network stack timeout processing runs
    NetRun = 0,
    /// Dispatch passes that drained the slot table
    DispatchRun = 1,
    /// Dispatch passes deferred because the critical section was held
    DispatchDeferred = 2,
    /// Cross-core wake IRQs handled
    WakeIrq = 3,
    /// Driver polls
    DriverPoll = 4,
    /// Periodic dumps written to the log
    StatsDump = 5,
}

impl Stat {
    /// Number of counters.
    pub const COUNT: usize = 6;

    /// All counters, in index order.
    pub const ALL: [Stat; Stat::COUNT] = [
        Stat::NetRun,
        Stat::DispatchRun,
        Stat::DispatchDeferred,
        Stat::WakeIrq,
        Stat::DriverPoll,
        Stat::StatsDump,
    ];

    /// Short name used in dumps.
    pub fn name(self) -> &'static str {
        match self {
            Stat::NetRun => "net_run",
            Stat::DispatchRun => "dispatch_run",
            Stat::DispatchDeferred => "dispatch_deferred",
            Stat::WakeIrq => "wake_irq",
            Stat::DriverPoll => "driver_poll",
            Stat::StatsDump => "stats_dump",
        }
    }
}

/// Counter block.
#[derive(Debug)]
pub struct Stats {
    counters: [AtomicU32; Stat::COUNT],
}

impl Stats {
    /// All counters zero.
    pub const fn new() -> Self {
        Self {
            counters: [
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
            ],
        }
    }

    /// Increment a counter (wrapping).
    pub fn inc(&self, stat: Stat) {
        self.counters[stat as usize].fetch_add(1, Ordering::Relaxed);
    }

    /// Read a counter.
    pub fn get(&self, stat: Stat) -> u32 {
        self.counters[stat as usize].load(Ordering::Relaxed)
    }

    /// Zero all counters.
    pub fn reset(&self) {
        for counter in &self.counters {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Log every counter at info level.
    pub fn dump(&self) {
        self.inc(Stat::StatsDump);
        for stat in Stat::ALL {
            info!("stat {}: {}", stat.name(), self.get(stat));
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
