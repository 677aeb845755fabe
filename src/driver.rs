//! Driver spawns and manages the acquisition task

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::assembler::FrameAssembler;
use crate::outbound::{Delivery, OutboundSender};
use crate::protocol::{DEPTH_FRAME_NOTICE, VIDEO_FRAME_NOTICE, error_line};
use crate::provider::SensorSource;
use crate::shm::RasterWriter;
use crate::types::SensorFrame;
use crate::Result;

/// Counters reported when acquisition ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DriverSummary {
    pub ticks: u64,
    /// Ticks that produced at least one line.
    pub batches_sent: u64,
    /// Ticks whose lines did not fit in the outbound queue.
    pub batches_dropped: u64,
    /// `Error` lines emitted for recoverable failures.
    pub errors_reported: u64,
}

/// Acquisition settings.
#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    /// Consecutive source errors before giving up.
    pub max_source_errors: u32,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self { max_source_errors: 10 }
    }
}

/// Driver spawns the acquisition task
///
/// The task owns the source, the assembler scratch buffers and the raster
/// writer, so none of them are ever shared with the ping or inbound tasks.
pub struct Driver;

impl Driver {
    /// Spawn the acquisition task for the given source.
    pub fn spawn<S>(
        source: S,
        outbound: OutboundSender,
        rasters: Option<RasterWriter>,
        options: DriverOptions,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<DriverSummary>>
    where
        S: SensorSource,
    {
        tokio::spawn(Self::acquisition_task(source, outbound, rasters, options, cancel))
    }

    /// Acquisition task - one tick per source frame
    async fn acquisition_task<S>(
        mut source: S,
        outbound: OutboundSender,
        mut rasters: Option<RasterWriter>,
        options: DriverOptions,
        cancel: CancellationToken,
    ) -> Result<DriverSummary>
    where
        S: SensorSource,
    {
        info!(tick_rate = source.tick_rate(), rasters = rasters.is_some(), "Acquisition task started");
        let mut assembler = FrameAssembler::new();
        let mut summary = DriverSummary::default();
        let mut error_count = 0u32;
        let max_errors = options.max_source_errors.max(1);

        loop {
            if cancel.is_cancelled() {
                info!("Acquisition cancelled");
                break;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Acquisition cancelled during read");
                    break;
                }
                result = source.next_frame() => result,
            };

            match result {
                Ok(Some(frame)) => {
                    summary.ticks += 1;
                    error_count = 0;

                    let lines = tick_lines(&mut assembler, rasters.as_mut(), &frame, &mut summary);
                    if lines.is_empty() {
                        trace!(tick = summary.ticks, "No tracked subject");
                        continue;
                    }
                    match outbound.try_send_batch(lines)? {
                        Delivery::Queued => summary.batches_sent += 1,
                        Delivery::Dropped => summary.batches_dropped += 1,
                    }
                }
                Ok(None) => {
                    info!("Source ended after {} ticks", summary.ticks);
                    break;
                }
                Err(e) => {
                    // Source errors are reported on the channel and retried
                    error_count += 1;
                    error!("Source error ({}/{}): {}", error_count, max_errors, e);
                    outbound.try_send(error_line(&e.to_string()))?;
                    summary.errors_reported += 1;

                    if error_count >= max_errors {
                        error!("Too many source errors, stopping acquisition");
                        return Err(e);
                    }

                    // Exponential backoff: 100ms, 200ms, 400ms, ...
                    let backoff = std::time::Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        if let Some(writer) = rasters.as_mut() {
            writer.close();
        }
        debug!(?summary, "Acquisition task ended");
        Ok(summary)
    }
}

/// Build the ordered lines for one tick: skeleton, left hand, right hand,
/// then any raster notices or raster errors.
fn tick_lines(
    assembler: &mut FrameAssembler,
    rasters: Option<&mut RasterWriter>,
    frame: &SensorFrame,
    summary: &mut DriverSummary,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(5);
    if let Some(tick) = assembler.assemble(&frame.bodies) {
        lines.extend(tick.in_order().map(str::to_owned));
    }

    let Some(writer) = rasters else {
        return lines;
    };
    if let Some(color) = &frame.color {
        match writer.write_color(color) {
            Ok(()) => lines.push(VIDEO_FRAME_NOTICE.to_string()),
            Err(e) => {
                warn!(error = %e, "Color frame write failed");
                lines.push(error_line(&e.to_string()));
                summary.errors_reported += 1;
            }
        }
    }
    if let Some(depth) = &frame.depth {
        match writer.write_depth(depth) {
            Ok(()) => lines.push(DEPTH_FRAME_NOTICE.to_string()),
            Err(e) => {
                warn!(error = %e, "Depth frame write failed");
                lines.push(error_line(&e.to_string()));
                summary.errors_reported += 1;
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound;
    use crate::test_utils::{ScriptedSource, tracked_body};
    use crate::types::HandState;
    use crate::BridgeError;

    fn drain(rx: &mut outbound::OutboundReceiver) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn ticks_produce_ordered_batches() {
        let (tx, mut rx) = outbound::channel(16);
        let source = ScriptedSource::new(vec![
            Ok(SensorFrame::from_bodies(vec![tracked_body(1.0, HandState::Open, HandState::Lasso)])),
            Ok(SensorFrame::default()),
        ]);

        let summary = Driver::spawn(source, tx, None, DriverOptions::default(), CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.ticks, 2);
        assert_eq!(summary.batches_sent, 1);
        let lines = drain(&mut rx);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("S|0 2 "));
        assert_eq!(&lines[1..], ["L|2", "R|4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn source_errors_become_error_lines_and_acquisition_continues() {
        let (tx, mut rx) = outbound::channel(16);
        let source = ScriptedSource::new(vec![
            Err(BridgeError::decode("joint type", "joint id 31 out of range")),
            Ok(SensorFrame::from_bodies(vec![tracked_body(1.0, HandState::Closed, HandState::Open)])),
        ]);

        let summary = Driver::spawn(source, tx, None, DriverOptions::default(), CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.errors_reported, 1);
        let lines = drain(&mut rx);
        assert!(lines[0].starts_with("E|Decode error in joint type"));
        assert_eq!(lines.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn too_many_source_errors_stop_acquisition() {
        let (tx, _rx) = outbound::channel(16);
        let source = ScriptedSource::new(vec![
            Err(BridgeError::transport_unavailable("sensor", "gone")),
            Err(BridgeError::transport_unavailable("sensor", "gone")),
        ]);
        let options = DriverOptions { max_source_errors: 2 };

        let result = Driver::spawn(source, tx, None, options, CancellationToken::new()).await.unwrap();
        assert!(matches!(result, Err(BridgeError::TransportUnavailable { .. })));
    }

    #[tokio::test]
    async fn full_queue_drops_the_tick_not_part_of_it() {
        let (tx, mut rx) = outbound::channel(4);
        let frames = (0..3)
            .map(|_| Ok(SensorFrame::from_bodies(vec![tracked_body(1.0, HandState::Open, HandState::Open)])))
            .collect();

        let summary =
            Driver::spawn(ScriptedSource::new(frames), tx, None, DriverOptions::default(), CancellationToken::new())
                .await
                .unwrap()
                .unwrap();

        assert_eq!(summary.batches_sent, 1);
        assert_eq!(summary.batches_dropped, 2);
        assert_eq!(drain(&mut rx).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn acquisition_keeps_ticking_while_the_writer_is_blocked() {
        let (tx, rx) = outbound::channel(8);
        let writer_cancel = CancellationToken::new();
        // Never read, so the writer stalls on its first flush.
        let (client, _server) = tokio::io::duplex(16);
        let writer = tokio::spawn(outbound::write_lines(rx, client, writer_cancel.clone()));

        let frames = (0..20)
            .map(|_| Ok(SensorFrame::from_bodies(vec![tracked_body(1.0, HandState::Open, HandState::Closed)])))
            .collect();
        let acquisition =
            Driver::spawn(ScriptedSource::new(frames), tx, None, DriverOptions::default(), CancellationToken::new());

        let summary = tokio::time::timeout(std::time::Duration::from_secs(5), acquisition)
            .await
            .expect("acquisition must not wait on the consumer")
            .unwrap()
            .unwrap();
        assert_eq!(summary.ticks, 20);
        assert!(summary.batches_dropped > 0);
        assert_eq!(summary.batches_sent + summary.batches_dropped, 20);
        assert!(!writer.is_finished());

        writer_cancel.cancel();
        writer.await.unwrap().unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn raster_writes_emit_notices_after_hands() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RasterWriter::open(Some(dir.path()), "color", "depth").unwrap();
        let (tx, mut rx) = outbound::channel(16);

        let mut frame = SensorFrame::from_bodies(vec![tracked_body(1.0, HandState::Open, HandState::Open)]);
        frame.color = Some(vec![1u8; crate::shm::COLOR_FRAME_SIZE].into());
        frame.depth = Some(vec![2u8; 10].into());

        let summary = Driver::spawn(
            ScriptedSource::new(vec![Ok(frame)]),
            tx,
            Some(writer),
            DriverOptions::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap()
        .unwrap();

        let lines = drain(&mut rx);
        assert_eq!(lines[3], "V|");
        assert!(lines[4].starts_with("E|Invalid buffer size"));
        assert_eq!(summary.errors_reported, 1);
    }

    #[tokio::test]
    async fn cancellation_stops_a_waiting_source() {
        let (tx, _rx) = outbound::channel(4);
        let cancel = CancellationToken::new();
        let handle = Driver::spawn(ScriptedSource::pending(), tx, None, DriverOptions::default(), cancel.clone());
        cancel.cancel();
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.ticks, 0);
    }
}
