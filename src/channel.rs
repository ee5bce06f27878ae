//! Exposed channels which can be used to observe the link from application code

use embassy_sync::channel::Channel;

use crate::message::PairingMessage;
use crate::{PEER_MESSAGE_CHANNEL_SIZE, RawMutex};

/// Messages received from the peer while in connected mode.
///
/// Purely observational: the state machine publishes every inbound connected
/// frame here and takes no protocol action on it. When the channel is full
/// the oldest message is dropped.
pub static PEER_MESSAGE_CHANNEL: Channel<RawMutex, PairingMessage, PEER_MESSAGE_CHANNEL_SIZE> = Channel::new();
