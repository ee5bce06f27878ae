//! Fixed-size pairing datagram and its wire codec.
//!
//! Every message has the same wire size: a NUL-terminated text field padded to
//! 32 bytes, followed by the sender's 6 address bytes. The sender address is
//! carried in the payload on purpose: the pairing protocol persists the
//! payload address, staying independent of the transport's own source-address
//! metadata.

use heapless::String;

use crate::address::{ADDRESS_LEN, MacAddress};

/// Maximum length of the message text, excluding the NUL terminator
pub const TEXT_MAX_LEN: usize = 31;
/// Size of the text field on the wire, including the NUL terminator
pub const TEXT_FIELD_SIZE: usize = TEXT_MAX_LEN + 1;
/// Total wire size of a message, identical for every message instance
pub const MESSAGE_WIRE_SIZE: usize = TEXT_FIELD_SIZE + ADDRESS_LEN;

/// Text of the periodic keep-alive / discovery announcement
pub const KEEPALIVE_TEXT: &str = "Hello Lets Talk";
/// Text of the discovery confirmation reply
pub const CONFIRM_TEXT: &str = "Yes Lets Talk";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Text longer than [`TEXT_MAX_LEN`]
    TextTooLong,
    /// No NUL terminator inside the text field
    UnterminatedText,
    /// Text bytes are not valid UTF-8
    InvalidText,
}

/// Message exchanged between the two nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PairingMessage {
    pub text: String<TEXT_MAX_LEN>,
    pub sender: MacAddress,
}

impl PairingMessage {
    pub fn new(text: &str, sender: MacAddress) -> Result<Self, FrameError> {
        let text = String::try_from(text).map_err(|_| FrameError::TextTooLong)?;
        Ok(Self { text, sender })
    }

    /// The keep-alive message, also used as the discovery announcement.
    pub fn keepalive(sender: MacAddress) -> Self {
        Self::new(KEEPALIVE_TEXT, sender).expect("keep-alive text fits the text field")
    }

    /// The confirmation reply sent once per boot session during discovery.
    pub fn confirmation(sender: MacAddress) -> Self {
        Self::new(CONFIRM_TEXT, sender).expect("confirmation text fits the text field")
    }

    pub fn to_bytes(&self) -> [u8; MESSAGE_WIRE_SIZE] {
        let mut buf = [0u8; MESSAGE_WIRE_SIZE];
        buf[..self.text.len()].copy_from_slice(self.text.as_bytes());
        // Bytes between the terminator and the address field stay zeroed
        buf[TEXT_FIELD_SIZE..].copy_from_slice(self.sender.as_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; MESSAGE_WIRE_SIZE]) -> Result<Self, FrameError> {
        let field = &buf[..TEXT_FIELD_SIZE];
        let len = field
            .iter()
            .position(|&b| b == 0)
            .ok_or(FrameError::UnterminatedText)?;
        let text = core::str::from_utf8(&field[..len]).map_err(|_| FrameError::InvalidText)?;
        let mut addr = [0u8; ADDRESS_LEN];
        addr.copy_from_slice(&buf[TEXT_FIELD_SIZE..]);
        Self::new(text, MacAddress::new(addr))
    }
}
