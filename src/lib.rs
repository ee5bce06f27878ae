#![no_std]
#![allow(async_fn_in_trait)]

//! Auto-pairing for two wireless nodes over a connectionless, broadcast-capable
//! link. A node boots, reads its persisted peer record, and enters either
//! discovery (peer unknown, announce over broadcast) or connected mode (peer
//! known, keep-alives to its stored address). Discovery completes by persisting
//! the peer's announced address and restarting; repeated delivery failures
//! clear the record and restart back into discovery.

#[macro_use]
mod fmt;

pub mod address;
pub mod boot;
pub mod channel;
pub mod config;
pub mod driver;
pub mod message;
pub mod monitor;
pub mod pairing;
pub mod storage;

/// Raw mutex type used for all internal synchronization primitives
pub type RawMutex = embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// Capacity of [`channel::PEER_MESSAGE_CHANNEL`]
pub const PEER_MESSAGE_CHANNEL_SIZE: usize = 4;
