//! MAC address handling.

use core::fmt::{self, Write};

use crate::platform::BoardId;

/// 48-bit ethernet MAC address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Locally administered unicast address derived from the board id.
    ///
    /// Uses bytes 2..8 of the id, clears the multicast bit and sets the
    /// locally-administered bit.
    pub fn from_board_id(id: &BoardId) -> Self {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&id[2..8]);
        mac[0] &= !0x01;
        mac[0] |= 0x02;
        MacAddress(mac)
    }

    /// Whether the locally-administered bit is set.
    pub fn is_local(&self) -> bool {
        self.0[0] & 0x02 != 0
    }

    /// Whether the multicast bit is set.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Colon-separated lowercase hex, e.g. `02:11:22:33:44:55`.
    pub fn to_hex_string(&self) -> heapless::String<17> {
        let mut s = heapless::String::new();
        // 17 bytes is exactly enough
        let _ = write!(s, "{}", self);
        s
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}
