//! Deferred dispatch slot table.
//!
//! Each slot holds at most one pending callback. Scheduling into an occupied
//! slot overwrites the previous callback instead of queueing it.

use core::cell::Cell;

use critical_section::Mutex;

/// Deferred callback. Receives the arch context it was scheduled on.
pub type DispatchFn<T> = fn(&T);

/// Dispatch slots.
#[repr(usize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    /// Driver poll (also used when a cross-core wake lands on the owner core)
    Driver = 0,

    /// Adapter work: periodic worker (network-stack timeouts, sleep aging)
    Adapter = 1,
}

impl Slot {
    /// Number of slots.
    pub const COUNT: usize = 2;

    /// Slot index.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Slot for an index, `None` if out of range.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Slot::Driver),
            1 => Some(Slot::Adapter),
            _ => None,
        }
    }
}

/// Fixed-size table of pending callbacks.
pub struct DispatchTable<T, const N: usize> {
    slots: Mutex<Cell<[Option<DispatchFn<T>>; N]>>,
}

impl<T, const N: usize> DispatchTable<T, N> {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(Cell::new([None; N])),
        }
    }

    fn check(index: usize) {
        assert!(index < N, "dispatch slot {} out of range (count {})", index, N);
    }

    /// Record `f` in slot `index`, replacing any pending callback.
    ///
    /// # Panics
    ///
    /// If `index >= N`.
    pub fn set(&self, index: usize, f: DispatchFn<T>) {
        Self::check(index);
        critical_section::with(|cs| {
            let cell = self.slots.borrow(cs);
            let mut slots = cell.get();
            slots[index] = Some(f);
            cell.set(slots);
        });
    }

    /// Remove and return the callback in slot `index`.
    pub fn take(&self, index: usize) -> Option<DispatchFn<T>> {
        Self::check(index);
        critical_section::with(|cs| {
            let cell = self.slots.borrow(cs);
            let mut slots = cell.get();
            let f = slots[index].take();
            cell.set(slots);
            f
        })
    }

    /// Callback pending in slot `index`, without removing it.
    pub fn peek(&self, index: usize) -> Option<DispatchFn<T>> {
        Self::check(index);
        critical_section::with(|cs| self.slots.borrow(cs).get()[index])
    }

    /// Whether slot `index` has a pending callback.
    pub fn is_pending(&self, index: usize) -> bool {
        self.peek(index).is_some()
    }

    /// Whether any slot has a pending callback.
    pub fn any_pending(&self) -> bool {
        critical_section::with(|cs| self.slots.borrow(cs).get().iter().any(Option::is_some))
    }

    /// Drop all pending callbacks.
    pub fn clear(&self) {
        critical_section::with(|cs| self.slots.borrow(cs).set([None; N]));
    }

    /// Run pending callbacks in slot order, clearing each slot before its
    /// callback runs. Returns how many ran.
    ///
    /// A callback may reschedule into any slot, including its own; a slot
    /// refilled after it was visited stays pending for the next pass.
    pub fn drain(&self, ctx: &T) -> usize {
        let mut ran = 0;
        for index in 0..N {
            if let Some(f) = self.take(index) {
                f(ctx);
                ran += 1;
            }
        }
        ran
    }
}

impl<T, const N: usize> Default for DispatchTable<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> core::fmt::Debug for DispatchTable<T, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut pending = heapless::Vec::<usize, N>::new();
        for index in 0..N {
            if self.is_pending(index) {
                let _ = pending.push(index);
            }
        }
        f.debug_struct("DispatchTable")
            .field("pending", &pending.as_slice())
            .finish()
    }
}
