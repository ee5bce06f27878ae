//! Hardware address type and its colon-hex string codec.

use core::fmt::Write;

use heapless::String;

/// Number of bytes in a hardware address
pub const ADDRESS_LEN: usize = 6;
/// Length of the canonical string form, `XX:XX:XX:XX:XX:XX`
pub const ADDRESS_STR_LEN: usize = 17;

/// Error returned when parsing a malformed address string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FormatError {
    InvalidLength,
    InvalidSeparator,
    InvalidHexDigit,
}

/// Fixed 6-byte hardware address of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacAddress(pub [u8; ADDRESS_LEN]);

impl MacAddress {
    /// The broadcast address, used as the send target during discovery
    pub const BROADCAST: Self = Self([0xFF; ADDRESS_LEN]);

    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Whether this address is the stored-record empty sentinel.
    ///
    /// A record whose first byte is `0x00` is treated as "no peer stored";
    /// no real address begins with a zero byte under this protocol.
    pub const fn is_unset(&self) -> bool {
        self.0[0] == 0x00
    }

    /// Canonical colon-separated uppercase hex form, always 17 characters.
    pub fn to_colon_hex(&self) -> String<ADDRESS_STR_LEN> {
        let mut s = String::new();
        // Writing 17 ASCII chars into a 17-byte string cannot fail
        write!(s, "{}", self).ok();
        s
    }

    /// Parse the colon-hex string form back into an address.
    ///
    /// Accepts upper- or lowercase hex digits; everything else about the
    /// format is strict: exactly 17 bytes, `:` at every third position.
    pub fn parse(s: &str) -> Result<Self, FormatError> {
        let bytes = s.as_bytes();
        if bytes.len() != ADDRESS_STR_LEN {
            return Err(FormatError::InvalidLength);
        }
        let mut addr = [0u8; ADDRESS_LEN];
        for (i, chunk) in addr.iter_mut().enumerate() {
            let hi = hex_val(bytes[i * 3]).ok_or(FormatError::InvalidHexDigit)?;
            let lo = hex_val(bytes[i * 3 + 1]).ok_or(FormatError::InvalidHexDigit)?;
            if i < ADDRESS_LEN - 1 && bytes[i * 3 + 2] != b':' {
                return Err(FormatError::InvalidSeparator);
            }
            *chunk = (hi << 4) | lo;
        }
        Ok(Self(addr))
    }
}

impl core::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let a = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        )
    }
}

const fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}
