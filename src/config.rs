//! Tunable configuration of the pairing protocol and its storage region.

use embassy_time::Duration;

/// Timing and policy knobs of the pairing state machine.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PairingConfig {
    /// Cadence of the steady-state keep-alive send
    pub keepalive_interval: Duration,
    /// Pause after boot before the first announcement, letting the peer
    /// finish booting and register its own receive handler
    pub boot_settle_delay: Duration,
    /// Pause between the discovery confirmation and the restart
    pub restart_settle_delay: Duration,
    /// Consecutive delivery failures that force a full pairing reset
    pub failure_threshold: u32,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_millis(500),
            boot_settle_delay: Duration::from_millis(2000),
            restart_settle_delay: Duration::from_millis(500),
            failure_threshold: 6,
        }
    }
}

/// Config of the flash region backing the peer record.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StorageConfig {
    /// Start address of local storage, MUST BE start of a sector.
    /// If start_addr is set to 0(this is the default value), the last `num_sectors` sectors will be used.
    pub start_addr: usize,
    // Number of sectors used for storage, >= 2.
    pub num_sectors: u8,
    // Erase the storage at boot, dropping any stored pairing
    pub clear_storage: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            start_addr: 0,
            num_sectors: 2,
            clear_storage: false,
        }
    }
}
