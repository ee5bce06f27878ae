//! Consecutive send-failure tracking driving the re-pairing reset policy.

/// Tracks consecutive delivery failures reported by the transport.
///
/// The monitor itself is pure state: it only reports when the threshold is
/// crossed, and the session loop performs the destructive side effects
/// (clear the peer record, restart).
pub struct DeliveryMonitor {
    failures: u32,
    threshold: u32,
}

impl DeliveryMonitor {
    /// A `threshold` of zero would make the trigger unreachable and is
    /// clamped to 1.
    pub fn new(threshold: u32) -> Self {
        Self {
            failures: 0,
            threshold: threshold.max(1),
        }
    }

    /// Feed one asynchronous send outcome.
    ///
    /// Returns `true` exactly when the consecutive-failure count reaches the
    /// threshold, once per run of failures. A success resets the count to
    /// zero.
    pub fn on_send_result(&mut self, delivered: bool) -> bool {
        if delivered {
            self.failures = 0;
            return false;
        }
        self.failures += 1;
        if self.failures == self.threshold {
            warn!("Send failed {} times in a row", self.failures);
            true
        } else {
            trace!("Send failed, {} consecutive failures", self.failures);
            false
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
