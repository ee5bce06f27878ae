//! The abstracted driver layer of the radio link.
//!
//! The radio itself is a platform service; the pairing logic only needs a
//! datagram writer, a peer registration hook, and a single event stream that
//! funnels the transport's two asynchronous notifications (inbound frame,
//! delivery status) to one consumer. Funneling both through [`LinkReader`]
//! preserves the protocol invariant that no two handlers run concurrently
//! with the steady-state loop.

use crate::address::MacAddress;
use crate::message::PairingMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// The transport rejected the send before attempting delivery
    Enqueue,
    /// An inbound datagram did not decode as a [`PairingMessage`]
    InvalidFrame,
    /// Vendor bus or radio error code
    Bus(u8),
    Disconnected,
}

/// Outcome of one asynchronous send, reported after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered)
    }
}

/// One asynchronous notification from the transport.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// A decoded inbound datagram
    Frame(PairingMessage),
    /// Completion report for a previously enqueued send
    SendStatus(DeliveryStatus),
}

/// Link event reader, the single consumer side of the transport callbacks.
pub trait LinkReader {
    async fn read(&mut self) -> Result<LinkEvent, LinkError>;
}

/// Datagram writer towards a specific or broadcast address.
pub trait LinkWriter {
    /// Register `address` as a send target on the fixed channel, without
    /// encryption. Must be idempotent: re-registering an address replaces any
    /// existing registration for it.
    async fn register_peer(&mut self, address: MacAddress) -> Result<(), LinkError>;

    /// Enqueue one datagram to `dest` and return the number of bytes
    /// accepted. A returned `Ok` only means the frame was queued; the actual
    /// delivery outcome arrives later as [`LinkEvent::SendStatus`].
    async fn write(&mut self, dest: MacAddress, message: &PairingMessage) -> Result<usize, LinkError>;
}
