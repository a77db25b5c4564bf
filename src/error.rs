//! Error types for arch operations.
//!
//! `ArchError` covers the recoverable conditions returned from init and
//! connect calls. Misuse of the concurrency contract (wrong core, lock not
//! held, bad dispatch slot) is never reported here; it panics instead.

use core::fmt;

use crate::driver::LinkStatus;

/// Integer code for success.
pub const OK: i32 = 0;
/// Unspecified failure.
pub const ERROR_GENERIC: i32 = -1;
/// Operation timed out.
pub const ERROR_TIMEOUT: i32 = -2;
/// Operation not permitted.
pub const ERROR_NOT_PERMITTED: i32 = -4;
/// Invalid argument.
pub const ERROR_INVALID_ARG: i32 = -5;
/// I/O error.
pub const ERROR_IO: i32 = -6;

/// Arch error type.
///
/// Every variant maps onto the platform's negative integer error codes via
/// [`ArchError::code`], so C-style callers can keep their `0 == success`
/// contract.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArchError {
    /// Unspecified failure (e.g. no alarm slot available at init)
    Generic,

    /// Deadline elapsed before the operation completed
    Timeout,

    /// Operation not permitted
    NotPermitted,

    /// Invalid argument
    InvalidArg,

    /// I/O error reported by the driver
    Io,

    /// Link reached a terminal failure status while connecting
    Link(LinkStatus),
}

impl ArchError {
    /// Platform integer code for this error (always negative).
    pub const fn code(self) -> i32 {
        match self {
            ArchError::Generic => ERROR_GENERIC,
            ArchError::Timeout => ERROR_TIMEOUT,
            ArchError::NotPermitted => ERROR_NOT_PERMITTED,
            ArchError::InvalidArg => ERROR_INVALID_ARG,
            ArchError::Io => ERROR_IO,
            ArchError::Link(status) => status as i32,
        }
    }

    /// Map a platform integer code back to an error.
    ///
    /// Returns `None` for [`OK`] and for codes with no known meaning.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            ERROR_GENERIC => Some(ArchError::Generic),
            ERROR_TIMEOUT => Some(ArchError::Timeout),
            ERROR_NOT_PERMITTED => Some(ArchError::NotPermitted),
            ERROR_INVALID_ARG => Some(ArchError::InvalidArg),
            ERROR_IO => Some(ArchError::Io),
            _ => None,
        }
    }
}

/// Flatten a result into the platform's integer contract (0 on success).
pub fn status_code(result: Result<(), ArchError>) -> i32 {
    match result {
        Ok(()) => OK,
        Err(e) => e.code(),
    }
}

impl fmt::Display for ArchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchError::Generic => write!(f, "Generic error"),
            ArchError::Timeout => write!(f, "Timeout"),
            ArchError::NotPermitted => write!(f, "Operation not permitted"),
            ArchError::InvalidArg => write!(f, "Invalid argument"),
            ArchError::Io => write!(f, "I/O error"),
            ArchError::Link(status) => write!(f, "Link failed: {}", status),
        }
    }
}
