//! Recursive mutex with an explicit state machine.
//!
//! | state            | event            | next                       |
//! |------------------|------------------|----------------------------|
//! | Unlocked         | enter(o)         | LockedBy(o, 1)             |
//! | LockedBy(o, d)   | enter(o)         | LockedBy(o, d + 1)         |
//! | LockedBy(o, d)   | enter(p), p != o | unchanged (caller waits)   |
//! | LockedBy(o, 1)   | exit(o)          | Unlocked                   |
//! | LockedBy(o, d)   | exit(o), d > 1   | LockedBy(o, d - 1)         |
//! | other            | exit(o)          | contract violation (panic) |
//!
//! State lives in a `critical_section::Mutex<Cell<_>>`, so transitions are
//! atomic with respect to interrupts and the other core.

use core::cell::Cell;

use critical_section::Mutex;

use crate::platform::OwnerId;

/// Lock state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LockState {
    /// Nobody holds the lock
    Unlocked,

    /// Held by `owner`, entered `depth` times (never 0)
    LockedBy {
        /// Holder identity
        owner: OwnerId,
        /// Nesting depth
        depth: u32,
    },
}

impl LockState {
    /// Transition for `enter(owner)`. `None` means the caller must wait.
    pub fn enter(self, owner: OwnerId) -> Option<LockState> {
        match self {
            LockState::Unlocked => Some(LockState::LockedBy { owner, depth: 1 }),
            LockState::LockedBy { owner: held, depth } if held == owner => {
                Some(LockState::LockedBy { owner, depth: depth + 1 })
            }
            LockState::LockedBy { .. } => None,
        }
    }

    /// Transition for `exit(owner)`. `None` means the caller does not hold
    /// the lock.
    pub fn exit(self, owner: OwnerId) -> Option<LockState> {
        match self {
            LockState::LockedBy { owner: held, depth: 1 } if held == owner => {
                Some(LockState::Unlocked)
            }
            LockState::LockedBy { owner: held, depth } if held == owner => {
                Some(LockState::LockedBy { owner, depth: depth - 1 })
            }
            _ => None,
        }
    }

    /// Nesting depth (0 when unlocked).
    pub fn depth(self) -> u32 {
        match self {
            LockState::Unlocked => 0,
            LockState::LockedBy { depth, .. } => depth,
        }
    }

    /// Current holder.
    pub fn owner(self) -> Option<OwnerId> {
        match self {
            LockState::Unlocked => None,
            LockState::LockedBy { owner, .. } => Some(owner),
        }
    }
}

/// Mutex that the same owner may re-enter without deadlocking.
pub struct RecursiveMutex {
    state: Mutex<Cell<LockState>>,
}

impl RecursiveMutex {
    /// Create an unlocked mutex.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(LockState::Unlocked)),
        }
    }

    /// Force the mutex back to `Unlocked`.
    ///
    /// Only valid while no context can hold it (arch init).
    pub fn reset(&self) {
        critical_section::with(|cs| self.state.borrow(cs).set(LockState::Unlocked));
    }

    /// Current state snapshot.
    pub fn state(&self) -> LockState {
        critical_section::with(|cs| self.state.borrow(cs).get())
    }

    /// Try to enter once. Returns the new depth on success.
    pub fn try_enter(&self, owner: OwnerId) -> Option<u32> {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let next = cell.get().enter(owner)?;
            cell.set(next);
            Some(next.depth())
        })
    }

    /// Enter, calling `wait` between attempts until the lock is free.
    ///
    /// `wait` is typically wait-for-event; [`RecursiveMutex::exit`] callers
    /// signal an event after releasing.
    pub fn enter_blocking(&self, owner: OwnerId, mut wait: impl FnMut()) -> u32 {
        loop {
            if let Some(depth) = self.try_enter(owner) {
                return depth;
            }
            wait();
        }
    }

    /// Leave one level. Returns the remaining depth.
    ///
    /// # Panics
    ///
    /// If `owner` does not hold the lock.
    pub fn exit(&self, owner: OwnerId) -> u32 {
        let next = critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let next = cell.get().exit(owner);
            if let Some(next) = next {
                cell.set(next);
            }
            next
        });
        match next {
            Some(state) => state.depth(),
            None => panic!("recursive mutex released by a context that does not hold it"),
        }
    }

    /// Nesting depth (0 when unlocked).
    pub fn enter_count(&self) -> u32 {
        self.state().depth()
    }

    /// Current holder.
    pub fn owner(&self) -> Option<OwnerId> {
        self.state().owner()
    }

    /// Whether `owner` currently holds the lock.
    pub fn is_held_by(&self, owner: OwnerId) -> bool {
        self.owner() == Some(owner)
    }
}

impl Default for RecursiveMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for RecursiveMutex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecursiveMutex")
            .field("state", &self.state())
            .finish()
    }
}
