#![allow(dead_code)]

pub mod test_block_on;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use embassy_sync::channel::Channel;
use embassy_time::Instant;
use embedded_storage_async::nor_flash::{ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash};
use pairlink::RawMutex;
use pairlink::address::MacAddress;
use pairlink::driver::{DeliveryStatus, LinkError, LinkEvent, LinkReader, LinkWriter};
use pairlink::message::{MESSAGE_WIRE_SIZE, PairingMessage};

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

const SECTOR_SIZE: usize = 4096;
const SECTOR_COUNT: usize = 2;

#[derive(Debug)]
pub struct MemFlashError;

impl NorFlashError for MemFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::OutOfBounds
    }
}

/// In-memory NOR flash. Clones share the backing storage, so re-creating a
/// `Storage` over a clone simulates a power cycle.
#[derive(Clone)]
pub struct MemFlash {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemFlash {
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(vec![0xFF; SECTOR_SIZE * SECTOR_COUNT])),
        }
    }
}

impl ErrorType for MemFlash {
    type Error = MemFlashError;
}

impl ReadNorFlash for MemFlash {
    const READ_SIZE: usize = 1;

    async fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let data = self.data.lock().unwrap();
        let start = offset as usize;
        let end = start + bytes.len();
        if end > data.len() {
            return Err(MemFlashError);
        }
        bytes.copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        SECTOR_SIZE * SECTOR_COUNT
    }
}

impl NorFlash for MemFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = SECTOR_SIZE;

    async fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        let mut data = self.data.lock().unwrap();
        if to as usize > data.len() || from > to {
            return Err(MemFlashError);
        }
        data[from as usize..to as usize].fill(0xFF);
        Ok(())
    }

    async fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut data = self.data.lock().unwrap();
        let start = offset as usize;
        let end = start + bytes.len();
        if end > data.len() {
            return Err(MemFlashError);
        }
        // NOR semantics: programming can only clear bits
        for (cell, b) in data[start..end].iter_mut().zip(bytes) {
            *cell &= b;
        }
        Ok(())
    }
}

struct MockLinkInner {
    events: Channel<RawMutex, LinkEvent, 16>,
    sent: Mutex<Vec<(MacAddress, PairingMessage)>>,
    sent_at: Mutex<Vec<Instant>>,
    registered: Mutex<Vec<MacAddress>>,
    fail_enqueue: AtomicBool,
    require_registration: AtomicBool,
}

/// Scripted link driver. Clones share state: the test keeps one clone to
/// inject events and inspect the sent datagrams while the session runs on the
/// other.
#[derive(Clone)]
pub struct MockLink {
    inner: Arc<MockLinkInner>,
}

impl MockLink {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockLinkInner {
                events: Channel::new(),
                sent: Mutex::new(Vec::new()),
                sent_at: Mutex::new(Vec::new()),
                registered: Mutex::new(Vec::new()),
                fail_enqueue: AtomicBool::new(false),
                require_registration: AtomicBool::new(false),
            }),
        }
    }

    pub fn push_frame(&self, message: PairingMessage) {
        self.inner
            .events
            .try_send(LinkEvent::Frame(message))
            .expect("mock link event queue full");
    }

    pub fn push_status(&self, delivered: bool) {
        let status = if delivered {
            DeliveryStatus::Delivered
        } else {
            DeliveryStatus::Failed
        };
        self.inner
            .events
            .try_send(LinkEvent::SendStatus(status))
            .expect("mock link event queue full");
    }

    pub fn set_fail_enqueue(&self, fail: bool) {
        self.inner.fail_enqueue.store(fail, Ordering::Release);
    }

    /// Reject writes to destinations that were never registered, as a
    /// conforming transport does.
    pub fn set_require_registration(&self, require: bool) {
        self.inner.require_registration.store(require, Ordering::Release);
    }

    pub fn sent(&self) -> Vec<(MacAddress, PairingMessage)> {
        self.inner.sent.lock().unwrap().clone()
    }

    /// Mock-time timestamp of each accepted send, in `sent()` order.
    pub fn sent_times(&self) -> Vec<Instant> {
        self.inner.sent_at.lock().unwrap().clone()
    }

    pub fn registered(&self) -> Vec<MacAddress> {
        self.inner.registered.lock().unwrap().clone()
    }
}

impl LinkReader for MockLink {
    async fn read(&mut self) -> Result<LinkEvent, LinkError> {
        Ok(self.inner.events.receive().await)
    }
}

impl LinkWriter for MockLink {
    async fn register_peer(&mut self, address: MacAddress) -> Result<(), LinkError> {
        let mut registered = self.inner.registered.lock().unwrap();
        registered.retain(|a| *a != address);
        registered.push(address);
        Ok(())
    }

    async fn write(&mut self, dest: MacAddress, message: &PairingMessage) -> Result<usize, LinkError> {
        if self.inner.fail_enqueue.load(Ordering::Acquire) {
            return Err(LinkError::Enqueue);
        }
        if self.inner.require_registration.load(Ordering::Acquire)
            && !self.inner.registered.lock().unwrap().contains(&dest)
        {
            return Err(LinkError::Enqueue);
        }
        self.inner.sent.lock().unwrap().push((dest, message.clone()));
        self.inner.sent_at.lock().unwrap().push(Instant::now());
        Ok(MESSAGE_WIRE_SIZE)
    }
}

/// Two cross-wired mock links: a datagram written on one side is delivered as
/// an inbound frame on the other, and a successful delivery status is
/// reported back to the sender.
#[derive(Clone)]
pub struct BridgedLink {
    local: MockLink,
    remote: MockLink,
}

pub fn bridged_pair() -> (BridgedLink, BridgedLink) {
    let a = MockLink::new();
    let b = MockLink::new();
    (
        BridgedLink {
            local: a.clone(),
            remote: b.clone(),
        },
        BridgedLink { local: b, remote: a },
    )
}

impl LinkReader for BridgedLink {
    async fn read(&mut self) -> Result<LinkEvent, LinkError> {
        self.local.read().await
    }
}

impl LinkWriter for BridgedLink {
    async fn register_peer(&mut self, address: MacAddress) -> Result<(), LinkError> {
        self.local.register_peer(address).await
    }

    async fn write(&mut self, dest: MacAddress, message: &PairingMessage) -> Result<usize, LinkError> {
        let n = self.local.write(dest, message).await?;
        self.remote.push_frame(message.clone());
        self.local.push_status(true);
        Ok(n)
    }
}
