//! Synchronization primitives shared by the arch modes.

pub mod lock;
pub mod signal;

pub use lock::{LockState, RecursiveMutex};
pub use signal::WorkSignal;
