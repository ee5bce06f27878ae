//! Persistent peer store over a flash region.
//!
//! The peer record lives in a `sequential-storage` map spanning a reserved
//! range of sectors. `store_item` completing is the durability barrier: once
//! `write_peer`/`clear_peer` return, the record survives power loss, and the
//! append-only item format means a torn write is detected and ignored rather
//! than read back as a half-updated address.

use core::ops::Range;

use embassy_embedded_hal::adapter::BlockingAsync;
use embedded_storage::nor_flash::NorFlash;
use embedded_storage_async::nor_flash::NorFlash as AsyncNorFlash;
use sequential_storage::Error as SSError;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{SerializationError, Value, fetch_item, store_item};

use crate::address::{ADDRESS_LEN, MacAddress};
use crate::config::StorageConfig;

/// Storage read/write/commit failure, reported upward to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Flash I/O error
    Flash,
    /// The reserved region is full
    Full,
    /// The reserved region failed consistency checks
    Corrupted,
    /// Stored bytes did not round-trip through the record codec
    Serialization,
}

/// State of the persisted peer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairingRecord {
    /// No peer stored yet, discovery required
    Empty,
    /// A peer address is stored
    Bound(MacAddress),
}

impl PairingRecord {
    /// Apply the empty sentinel convention: a first byte of `0x00` means no
    /// peer is stored, whatever the remaining bytes hold.
    pub fn from_address(address: MacAddress) -> Self {
        if address.is_unset() {
            PairingRecord::Empty
        } else {
            PairingRecord::Bound(address)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PairingRecord::Empty)
    }
}

/// StorageKeys is the prefix digit stored in the flash, it's used to identify the type of the stored data.
#[repr(u32)]
pub(crate) enum StorageKeys {
    StorageConfig = 0,
    PeerAddress = 0xED,
}

impl StorageKeys {
    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StorageKeys::StorageConfig),
            0xED => Some(StorageKeys::PeerAddress),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum StorageData {
    StorageConfig(LocalStorageConfig),
    PeerAddress([u8; ADDRESS_LEN]),
}

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct LocalStorageConfig {
    enable: bool,
}

impl Value<'_> for StorageData {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        match self {
            StorageData::StorageConfig(c) => {
                if buffer.len() < 2 {
                    return Err(SerializationError::BufferTooSmall);
                }
                buffer[0] = StorageKeys::StorageConfig as u8;
                // If enabled, write 0 to flash: 1 is the erased state
                buffer[1] = if c.enable { 0 } else { 1 };
                Ok(2)
            }
            StorageData::PeerAddress(addr) => {
                if buffer.len() < 1 + ADDRESS_LEN {
                    return Err(SerializationError::BufferTooSmall);
                }
                buffer[0] = StorageKeys::PeerAddress as u8;
                buffer[1..1 + ADDRESS_LEN].copy_from_slice(addr);
                Ok(1 + ADDRESS_LEN)
            }
        }
    }

    fn deserialize_from(buffer: &[u8]) -> Result<Self, SerializationError>
    where
        Self: Sized,
    {
        if buffer.is_empty() {
            return Err(SerializationError::InvalidFormat);
        }
        match StorageKeys::from_u8(buffer[0]) {
            Some(StorageKeys::StorageConfig) => {
                if buffer.len() < 2 {
                    return Err(SerializationError::BufferTooSmall);
                }
                Ok(StorageData::StorageConfig(LocalStorageConfig {
                    enable: buffer[1] == 0,
                }))
            }
            Some(StorageKeys::PeerAddress) => {
                if buffer.len() < 1 + ADDRESS_LEN {
                    return Err(SerializationError::InvalidData);
                }
                let mut addr = [0u8; ADDRESS_LEN];
                addr.copy_from_slice(&buffer[1..1 + ADDRESS_LEN]);
                Ok(StorageData::PeerAddress(addr))
            }
            None => Err(SerializationError::Custom(1)),
        }
    }
}

/// Wrap a blocking NorFlash into the async interface [`Storage`] expects.
pub fn async_flash_wrapper<F: NorFlash>(flash: F) -> BlockingAsync<F> {
    embassy_embedded_hal::adapter::BlockingAsync::new(flash)
}

/// The persistent peer store. Exclusively owns the reserved flash range; no
/// other component writes it.
pub struct Storage<F: AsyncNorFlash> {
    flash: F,
    storage_range: Range<u32>,
    buffer: [u8; STORAGE_BUFFER_SIZE],
}

// Larger than any stored item, and 32-byte aligned as some flashes require
const STORAGE_BUFFER_SIZE: usize = 32;

impl<F: AsyncNorFlash> Storage<F> {
    pub async fn new(flash: F, config: &StorageConfig) -> Self {
        // Check storage setting
        assert!(
            config.num_sectors >= 2,
            "Number of used sector for storage must larger than 1"
        );

        info!(
            "Flash capacity {} KB, pairlink uses {} KB({} sectors) starting from 0x{:X} as storage",
            flash.capacity() / 1024,
            (F::ERASE_SIZE * config.num_sectors as usize) / 1024,
            config.num_sectors,
            config.start_addr,
        );

        let storage_range = if config.start_addr == 0 {
            (flash.capacity() - config.num_sectors as usize * F::ERASE_SIZE) as u32..flash.capacity() as u32
        } else {
            assert!(
                config.start_addr % F::ERASE_SIZE == 0,
                "Storage's start addr MUST BE a multiplier of sector size"
            );
            config.start_addr as u32..(config.start_addr + config.num_sectors as usize * F::ERASE_SIZE) as u32
        };

        let mut storage = Self {
            flash,
            storage_range,
            buffer: [0; STORAGE_BUFFER_SIZE],
        };

        // Check whether the region has been initialized before
        if !storage.check_enable().await || config.clear_storage {
            debug!("Clearing storage!");
            let _ = sequential_storage::erase_all(&mut storage.flash, storage.storage_range.clone()).await;

            if let Err(e) = storage.initialize_storage().await {
                error!("Storage initialization failed: {:?}", e);
            }
        }

        storage
    }

    /// Load the peer record. A missing item reads as [`PairingRecord::Empty`],
    /// matching freshly erased storage.
    pub async fn read_peer(&mut self) -> Result<PairingRecord, StorageError> {
        let read_data = fetch_item::<u32, StorageData, _>(
            &mut self.flash,
            self.storage_range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &(StorageKeys::PeerAddress as u32),
        )
        .await
        .map_err(map_storage_error::<F>)?;

        match read_data {
            Some(StorageData::PeerAddress(addr)) => Ok(PairingRecord::from_address(MacAddress::new(addr))),
            _ => Ok(PairingRecord::Empty),
        }
    }

    /// Store the peer address. Durable once this returns.
    pub async fn write_peer(&mut self, address: MacAddress) -> Result<(), StorageError> {
        debug!("Saving peer address: {:?}", address);
        self.store_peer_bytes(*address.as_bytes()).await
    }

    /// Return the record to empty by storing the all-zero sentinel.
    pub async fn clear_peer(&mut self) -> Result<(), StorageError> {
        info!("Clearing peer address");
        self.store_peer_bytes([0; ADDRESS_LEN]).await
    }

    async fn store_peer_bytes(&mut self, bytes: [u8; ADDRESS_LEN]) -> Result<(), StorageError> {
        store_item(
            &mut self.flash,
            self.storage_range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &(StorageKeys::PeerAddress as u32),
            &StorageData::PeerAddress(bytes),
        )
        .await
        .map_err(map_storage_error::<F>)
    }

    async fn initialize_storage(&mut self) -> Result<(), StorageError> {
        store_item(
            &mut self.flash,
            self.storage_range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &(StorageKeys::StorageConfig as u32),
            &StorageData::StorageConfig(LocalStorageConfig { enable: true }),
        )
        .await
        .map_err(map_storage_error::<F>)
    }

    async fn check_enable(&mut self) -> bool {
        if let Ok(Some(StorageData::StorageConfig(config))) = fetch_item::<u32, StorageData, _>(
            &mut self.flash,
            self.storage_range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &(StorageKeys::StorageConfig as u32),
        )
        .await
        {
            return config.enable;
        }
        false
    }
}

fn map_storage_error<F: AsyncNorFlash>(e: SSError<F::Error>) -> StorageError {
    match e {
        SSError::Storage { value: _e } => {
            error!("Flash error");
            StorageError::Flash
        }
        SSError::FullStorage => {
            error!("Storage is full");
            StorageError::Full
        }
        SSError::Corrupted {} => {
            error!("Storage is corrupted");
            StorageError::Corrupted
        }
        SSError::BufferTooBig => {
            error!("Buffer too big");
            StorageError::Serialization
        }
        SSError::BufferTooSmall(x) => {
            error!("Buffer too small, needs {} bytes", x);
            StorageError::Serialization
        }
        SSError::SerializationError(e) => {
            error!("Map value error: {:?}", e);
            StorageError::Serialization
        }
        _ => {
            error!("Unknown storage error");
            StorageError::Flash
        }
    }
}
