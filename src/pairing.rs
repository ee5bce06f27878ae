//! The pairing state machine.
//!
//! Each boot session derives its mode once from the persisted peer record and
//! keeps it for the session's lifetime; the only mode transition is a restart
//! back through the boot decision. Both modes share the steady-state behavior
//! of sending a keep-alive to the current target on a fixed cadence and
//! feeding every delivery report to the failure monitor.

use embassy_futures::select::{Either3, select3};
use embassy_time::{Instant, Timer};
use embedded_storage_async::nor_flash::NorFlash as AsyncNorFlash;

use crate::address::MacAddress;
use crate::boot;
use crate::channel::PEER_MESSAGE_CHANNEL;
use crate::config::PairingConfig;
use crate::driver::{LinkEvent, LinkReader, LinkWriter};
use crate::message::PairingMessage;
use crate::monitor::DeliveryMonitor;
use crate::storage::{PairingRecord, Storage};

/// Mode of one boot session, derived from the peer record at boot and
/// immutable until the next restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairingMode {
    /// Peer unknown: announce over broadcast and wait for a peer announcement
    Discovery,
    /// Peer known: keep-alives to the stored address
    Connected,
}

/// Why a boot session ended and a restart is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RestartReason {
    /// Discovery completed: the peer address is persisted and confirmed
    PairingComplete,
    /// The delivery failure threshold was crossed; the record was cleared
    DeliveryLost,
}

/// Run the pairing service forever.
///
/// Wraps [`run_session`] in the restart cycle: on bare-metal targets
/// [`boot::restart_node`] resets the device and the loop body never runs
/// twice; elsewhere the loop re-enters the boot decision with freshly
/// initialized session state.
pub async fn run_pairing<D: LinkReader + LinkWriter, F: AsyncNorFlash>(
    mut driver: D,
    mut storage: Storage<F>,
    own_address: MacAddress,
    config: PairingConfig,
) -> ! {
    loop {
        let reason = run_session(&mut driver, &mut storage, own_address, &config).await;
        info!("Session ended: {:?}", reason);
        boot::restart_node();
    }
}

/// Run one boot session until it requests a restart.
pub async fn run_session<D: LinkReader + LinkWriter, F: AsyncNorFlash>(
    driver: &mut D,
    storage: &mut Storage<F>,
    own_address: MacAddress,
    config: &PairingConfig,
) -> RestartReason {
    // Boot decision. A failed read is not fatal: assuming an empty record
    // fails safe towards re-pairing.
    let record = match storage.read_peer().await {
        Ok(record) => record,
        Err(e) => {
            error!("Peer record read failed, assuming empty: {:?}", e);
            PairingRecord::Empty
        }
    };
    let (mode, target) = match record {
        PairingRecord::Empty => (PairingMode::Discovery, MacAddress::BROADCAST),
        PairingRecord::Bound(peer) => (PairingMode::Connected, peer),
    };
    info!("Booting in {:?} mode, target {:?}", mode, target);

    if let Err(e) = driver.register_peer(target).await {
        error!("Peer registration failed: {:?}", e);
    }

    // Let the peer finish its own boot before announcing
    Timer::after(config.boot_settle_delay).await;
    let keepalive = PairingMessage::keepalive(own_address);
    if let Err(e) = driver.write(target, &keepalive).await {
        warn!("Announcement enqueue failed: {:?}", e);
    }

    let mut monitor = DeliveryMonitor::new(config.failure_threshold);
    // One-shot guard: at most one confirmation reply per boot session
    let mut replied = false;
    let mut restart_at: Option<Instant> = None;
    let mut last_keepalive = Instant::now();

    loop {
        // Calculate the time until the next keep-alive send
        let elapsed = last_keepalive.elapsed().as_millis();
        let interval = config.keepalive_interval.as_millis();
        let wait_time = if elapsed >= interval { 1 } else { interval - elapsed };

        let restart_timer = async move {
            match restart_at {
                Some(at) => Timer::at(at).await,
                None => core::future::pending::<()>().await,
            }
        };

        match select3(driver.read(), Timer::after_millis(wait_time), restart_timer).await {
            Either3::First(Ok(LinkEvent::Frame(message))) => match mode {
                PairingMode::Discovery => {
                    // Persist the payload-carried address, not the
                    // transport's source metadata. Last writer wins.
                    let peer = message.sender;
                    info!("Discovery announcement from {:?}", peer);
                    match storage.write_peer(peer).await {
                        Err(e) => error!("Failed to persist peer address: {:?}", e),
                        Ok(()) => {
                            if !replied {
                                // Only registered addresses are valid send
                                // targets; the boot registration covered
                                // broadcast only. Registration is idempotent.
                                if let Err(e) = driver.register_peer(peer).await {
                                    error!("Peer registration failed: {:?}", e);
                                    continue;
                                }
                                let confirm = PairingMessage::confirmation(own_address);
                                match driver.write(peer, &confirm).await {
                                    Ok(_) => {
                                        replied = true;
                                        restart_at = Some(Instant::now() + config.restart_settle_delay);
                                    }
                                    Err(e) => {
                                        // Do not restart on a send that never
                                        // went out; the next inbound
                                        // announcement retries the reply
                                        warn!("Confirmation enqueue failed: {:?}", e);
                                    }
                                }
                            }
                        }
                    }
                }
                PairingMode::Connected => {
                    debug!("Message from peer {:?}: {:?}", message.sender, message.text);
                    if PEER_MESSAGE_CHANNEL.is_full() {
                        let _ = PEER_MESSAGE_CHANNEL.try_receive();
                    }
                    let _ = PEER_MESSAGE_CHANNEL.try_send(message);
                }
            },
            Either3::First(Ok(LinkEvent::SendStatus(status))) => {
                trace!("Send status: {:?}", status);
                if monitor.on_send_result(status.is_delivered()) {
                    warn!("Delivery lost, clearing pairing and restarting");
                    if let Err(e) = storage.clear_peer().await {
                        error!("Failed to clear peer record: {:?}", e);
                    }
                    return RestartReason::DeliveryLost;
                }
            }
            Either3::First(Err(e)) => {
                error!("Link read error: {:?}", e);
            }
            Either3::Second(_) => {
                // Keep-alive tick. In discovery this re-announces over
                // broadcast, in connected mode it targets the stored peer.
                let keepalive = PairingMessage::keepalive(own_address);
                if let Err(e) = driver.write(target, &keepalive).await {
                    warn!("Keep-alive enqueue failed: {:?}", e);
                }
                last_keepalive = Instant::now();
            }
            Either3::Third(_) => {
                return RestartReason::PairingComplete;
            }
        }
    }
}
