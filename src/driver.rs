//! Driver and network stack seams.
//!
//! The arch integrates two non-reentrant components it does not implement:
//! the USB network driver and the TCP/IP stack. Both are reached through the
//! traits below. Methods take `&self`; implementations own their interior
//! state and rely on the arch for serialization (see the `Arch` modes).

use core::fmt;

use crate::error::ArchError;
use crate::mac::MacAddress;

/// Link status reported by the driver.
///
/// Negative values are terminal failures and end a connect attempt.
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// No link
    Down = 0,
    /// Joining / enumerating
    Join = 1,
    /// Link up, no IP address yet
    NoIp = 2,
    /// Link up with an IP address
    Up = 3,
    /// Connection failed
    Fail = -1,
    /// No matching network / host found
    NoNet = -2,
    /// Authentication failure
    BadAuth = -3,
}

impl LinkStatus {
    /// Decode a raw driver status.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(LinkStatus::Down),
            1 => Some(LinkStatus::Join),
            2 => Some(LinkStatus::NoIp),
            3 => Some(LinkStatus::Up),
            -1 => Some(LinkStatus::Fail),
            -2 => Some(LinkStatus::NoNet),
            -3 => Some(LinkStatus::BadAuth),
            _ => None,
        }
    }

    /// Whether this status ends a connect attempt with an error.
    pub fn is_failure(self) -> bool {
        (self as i32) < 0
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            LinkStatus::Down => "link down",
            LinkStatus::Join => "joining",
            LinkStatus::NoIp => "no ip",
            LinkStatus::Up => "link up",
            LinkStatus::Fail => "link fail",
            LinkStatus::NoNet => "network fail",
            LinkStatus::BadAuth => "bad auth",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// USB network driver.
pub trait UsbDriver {
    /// Initialize the driver (USB stack bring-up).
    fn init(&self) -> Result<(), ArchError>;

    /// Shut the driver down.
    fn deinit(&self);

    /// Whether the driver currently has a poll routine registered.
    ///
    /// The periodic worker only ages the sleep counter and schedules
    /// [`UsbDriver::poll`] while this returns `true`.
    fn has_poll(&self) -> bool;

    /// Service the driver. Non-reentrant.
    fn poll(&self);

    /// Start connecting without waiting for the result.
    fn connect_async(&self) -> Result<(), ArchError>;

    /// Current link status.
    fn link_status(&self) -> LinkStatus;

    /// MAC address programmed in OTP, if any.
    fn otp_mac(&self) -> Option<MacAddress> {
        None
    }
}

/// TCP/IP stack.
pub trait NetStack {
    /// Initialize the stack. Called once per arch instance.
    fn init(&self, hostname: &str);

    /// Run expired stack timeouts. Non-reentrant.
    fn check_timeouts(&self);

    /// Driver reports the link on interface `itf` came up.
    fn set_link_up(&self, itf: usize);

    /// Driver reports the link on interface `itf` went down.
    fn set_link_down(&self, itf: usize);

    /// Driver delivers a received ethernet frame on interface `itf`.
    fn process_frame(&self, itf: usize, frame: &[u8]);
}

/// Network stack placeholder for builds without IP support.
///
/// Init and timeout processing are no-ops. Any attempt by the driver to
/// bring a link up or deliver a frame is a configuration error and panics.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct NoNetStack;

impl NoNetStack {
    fn unsupported() -> ! {
        panic!("IP not supported without a network stack")
    }
}

impl NetStack for NoNetStack {
    fn init(&self, _hostname: &str) {}

    fn check_timeouts(&self) {}

    fn set_link_up(&self, _itf: usize) {
        Self::unsupported()
    }

    fn set_link_down(&self, _itf: usize) {
        Self::unsupported()
    }

    fn process_frame(&self, _itf: usize, _frame: &[u8]) {
        Self::unsupported()
    }
}
