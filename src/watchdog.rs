//! Ping watchdog
//!
//! The bridge pings the consumer on a fixed interval and counts pings that
//! have not been acknowledged. An acknowledgement resets the count. Once the
//! count reaches the limit at an interval boundary, the ping task returns
//! [`BridgeError::WatchdogTimeout`] and the bridge shuts down.
//!
//! The counter is the only state shared with the inbound reader; the ping task
//! never touches the acquisition task's buffers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::outbound::{Delivery, OutboundSender};
use crate::protocol::PING_LINE;
use crate::{BridgeError, Result};

/// Outstanding-ping counter.
#[derive(Debug)]
pub struct Watchdog {
    outstanding: AtomicU32,
    limit: u32,
}

impl Watchdog {
    /// `limit` unacknowledged pings trip the watchdog. Zero is raised to one.
    pub fn new(limit: u32) -> Self {
        Self { outstanding: AtomicU32::new(0), limit: limit.max(1) }
    }

    /// Record a ping. Returns the outstanding count including this one.
    pub fn ping_sent(&self) -> u32 {
        self.outstanding.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    /// The consumer echoed a ping.
    pub fn acknowledge(&self) {
        let previous = self.outstanding.swap(0, Ordering::AcqRel);
        trace!(previous, "Ping acknowledged");
    }

    pub fn outstanding(&self) -> u32 {
        self.outstanding.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn expired(&self) -> bool {
        self.outstanding() >= self.limit
    }
}

/// Send a ping every `interval` until the watchdog expires or `cancel` fires.
///
/// Each ping is counted even when the outbound queue is full: a consumer that
/// does not drain the channel is as silent as one that does not answer.
pub async fn run_pings(
    watchdog: Arc<Watchdog>,
    outbound: OutboundSender,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    debug!(interval_ms = interval.as_millis() as u64, limit = watchdog.limit(), "Ping task started");

    loop {
        if outbound.try_send(PING_LINE.to_string())? == Delivery::Dropped {
            debug!("Ping dropped by full outbound queue");
        }
        let outstanding = watchdog.ping_sent();
        trace!(outstanding, "Ping sent");

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Ping task cancelled");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }

        if watchdog.expired() {
            let missed = watchdog.outstanding();
            error!(missed, "Consumer stopped acknowledging pings");
            return Err(BridgeError::WatchdogTimeout { missed });
        }
    }
}
