//! Bridge wiring
//!
//! [`Bridge::run`] performs the startup handshake on the outbound channel,
//! then runs four tasks until one of them ends the session:
//!
//! | task | owns | ends when |
//! |---|---|---|
//! | acquisition | source, assembler, raster writer | source ends or fails |
//! | ping timer | nothing but the shared counter | watchdog expires |
//! | inbound reader | input stream | input closes |
//! | outbound writer | output stream | all senders dropped, or cancelled |
//!
//! A clean end drains the outbound queue before returning, waiting at most
//! [`BridgeConfig::drain_timeout`]. A watchdog timeout cancels everything at
//! once, including a writer blocked on a consumer that stopped reading.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::driver::{Driver, DriverOptions, DriverSummary};
use crate::inbound::{InboundSummary, read_lines};
use crate::outbound::{self, write_lines};
use crate::protocol::{debug_line, error_line};
use crate::provider::SensorSource;
use crate::shm::RasterWriter;
use crate::watchdog::{Watchdog, run_pings};
use crate::{BridgeError, Result};

/// Startup debug message.
pub const STARTING_UP: &str = "Starting up...";
/// Debug message once a device is known to exist.
pub const FOUND_SENSOR: &str = "Found a sensor";
/// Error message when the source reports no device.
pub const NO_SENSOR: &str = "No sensor device was found.";

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// The source ran out of frames.
    SourceEnded(DriverSummary),
    /// The consumer closed its end of the text channel.
    InputClosed(InboundSummary),
}

/// One bridge session over a sensor source.
pub struct Bridge<S> {
    config: BridgeConfig,
    source: S,
}

impl<S: SensorSource> Bridge<S> {
    pub fn new(config: BridgeConfig, source: S) -> Self {
        Self { config, source }
    }

    /// Run the session over `input` (consumer to bridge) and `output`
    /// (bridge to consumer).
    ///
    /// Returns the clean shutdown reason, or the fatal error that ended the
    /// session: [`BridgeError::NoSensorAvailable`] at startup,
    /// [`BridgeError::WatchdogTimeout`], or a failure of one of the tasks.
    pub async fn run<R, W>(self, input: R, output: W) -> Result<Shutdown>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Self { config, mut source } = self;

        let (outbound, receiver) = outbound::channel(config.outbound_capacity);
        let writer_cancel = CancellationToken::new();
        let writer = tokio::spawn(write_lines(receiver, output, writer_cancel.clone()));

        outbound.send(debug_line(STARTING_UP)).await?;
        let devices = match source.device_count().await {
            Ok(devices) => devices,
            Err(e) => {
                outbound.send(error_line(&e.to_string())).await?;
                drop(outbound);
                finish_writer(writer, &writer_cancel, config.drain_timeout).await;
                return Err(e);
            }
        };
        if devices == 0 {
            error!("No sensor device was found");
            outbound.send(error_line(NO_SENSOR)).await?;
            drop(outbound);
            finish_writer(writer, &writer_cancel, config.drain_timeout).await;
            return Err(BridgeError::NoSensorAvailable);
        }
        info!(devices, "Sensor available");
        outbound.send(debug_line(FOUND_SENSOR)).await?;

        let rasters = if config.write_rasters {
            match RasterWriter::open(
                config.shm_dir.as_deref(),
                &config.color_region_name,
                &config.depth_region_name,
            ) {
                Ok(writer) => Some(writer),
                Err(e) => {
                    warn!(error = %e, "Raster buffers unavailable, continuing without them");
                    outbound.send(error_line(&e.to_string())).await?;
                    None
                }
            }
        } else {
            None
        };

        let cancel = CancellationToken::new();
        let watchdog = Arc::new(Watchdog::new(config.max_missed_pings));

        let mut acquisition = Driver::spawn(
            source,
            outbound.clone(),
            rasters,
            DriverOptions { max_source_errors: config.max_source_errors },
            cancel.child_token(),
        );
        let mut pings = tokio::spawn(run_pings(
            Arc::clone(&watchdog),
            outbound.clone(),
            config.ping_interval,
            cancel.child_token(),
        ));
        let mut inbound = tokio::spawn(read_lines(input, watchdog, outbound.clone(), cancel.child_token()));
        drop(outbound);

        let (outcome, finished) = tokio::select! {
            joined = &mut acquisition => (
                joined
                    .map_err(|e| BridgeError::task_failed("acquisition", e))
                    .and_then(|result| result.map(Shutdown::SourceEnded)),
                Task::Acquisition,
            ),
            joined = &mut pings => (
                match joined {
                    Ok(Ok(())) => Err(BridgeError::task_failed("ping", "ended without cancellation")),
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(BridgeError::task_failed("ping", e)),
                },
                Task::Ping,
            ),
            joined = &mut inbound => (
                joined
                    .map_err(|e| BridgeError::task_failed("inbound", e))
                    .and_then(|result| result.map(Shutdown::InputClosed)),
                Task::Inbound,
            ),
        };

        cancel.cancel();
        if matches!(outcome, Err(BridgeError::WatchdogTimeout { .. })) {
            writer_cancel.cancel();
        }

        // Joining the remaining tasks drops their senders, which lets the
        // writer drain the queue and end.
        if finished != Task::Acquisition {
            let _ = acquisition.await;
        }
        if finished != Task::Ping {
            let _ = pings.await;
        }
        if finished != Task::Inbound {
            let _ = inbound.await;
        }
        finish_writer(writer, &writer_cancel, config.drain_timeout).await;

        match &outcome {
            Ok(reason) => info!(?reason, "Bridge session ended"),
            Err(e) => error!(error = %e, "Bridge session failed"),
        }
        outcome
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Acquisition,
    Ping,
    Inbound,
}

/// Wait for the writer to drain the queue, for at most `grace`. A consumer
/// that stopped reading gets its remaining lines dropped.
async fn finish_writer(mut writer: JoinHandle<Result<u64>>, cancel: &CancellationToken, grace: Duration) {
    let joined = match tokio::time::timeout(grace, &mut writer).await {
        Ok(joined) => joined,
        Err(_) => {
            warn!(grace_ms = grace.as_millis() as u64, "Consumer is not reading, dropping queued lines");
            cancel.cancel();
            writer.await
        }
    };
    match joined {
        Ok(Ok(written)) => debug!(written, "Outbound writer finished"),
        Ok(Err(e)) => warn!(error = %e, "Outbound writer failed"),
        Err(e) => warn!(error = %e, "Outbound writer task failed"),
    }
}
