//! Outbound text channel
//!
//! Every producer (acquisition, ping timer, inbound diagnostics) hands whole
//! lines to a bounded queue. A single writer task drains the queue into the
//! text channel, so a slow consumer can never block the acquisition task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::codec::{FramedWrite, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{BridgeError, Result};

/// What happened to lines handed to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The queue had no room; nothing from the batch was queued.
    Dropped,
}

/// Cloneable handle for queueing outbound lines.
#[derive(Debug, Clone)]
pub struct OutboundSender {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicU64>,
}

/// Receiving half, consumed by [`write_lines`].
#[derive(Debug)]
pub struct OutboundReceiver {
    rx: mpsc::Receiver<String>,
}

/// Create the bounded outbound queue. A capacity of zero is raised to one.
pub fn channel(capacity: usize) -> (OutboundSender, OutboundReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (OutboundSender { tx, dropped: Arc::new(AtomicU64::new(0)) }, OutboundReceiver { rx })
}

impl OutboundReceiver {
    /// Next queued line, waiting until one arrives or every sender is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Next queued line if one is ready.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

impl OutboundSender {
    /// Queue all lines or none of them, without waiting.
    ///
    /// Lines of one batch stay adjacent and in order. When the queue cannot
    /// take the whole batch it is dropped and `Delivery::Dropped` returned.
    pub fn try_send_batch(&self, lines: Vec<String>) -> Result<Delivery> {
        if lines.is_empty() {
            return Ok(Delivery::Queued);
        }
        match self.tx.try_reserve_many(lines.len()) {
            Ok(permits) => {
                for (permit, line) in permits.zip(lines) {
                    permit.send(line);
                }
                Ok(Delivery::Queued)
            }
            Err(TrySendError::Full(())) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(lines = lines.len(), dropped_total = total, "Outbound queue full, dropping batch");
                Ok(Delivery::Dropped)
            }
            Err(TrySendError::Closed(())) => Err(BridgeError::channel_closed("outbound")),
        }
    }

    /// Queue a single line without waiting.
    pub fn try_send(&self, line: String) -> Result<Delivery> {
        match self.tx.try_send(line) {
            Ok(()) => Ok(Delivery::Queued),
            Err(TrySendError::Full(line)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(line = %line, dropped_total = total, "Outbound queue full, dropping line");
                Ok(Delivery::Dropped)
            }
            Err(TrySendError::Closed(_)) => Err(BridgeError::channel_closed("outbound")),
        }
    }

    /// Queue a line, waiting for room. Used only off the acquisition path.
    pub async fn send(&self, line: String) -> Result<()> {
        self.tx.send(line).await.map_err(|_| BridgeError::channel_closed("outbound"))
    }

    /// Number of batches or lines dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Drain the queue into `writer`, one newline-terminated line per message.
///
/// Returns the number of lines written once every sender is gone, or early
/// when `cancel` fires. Lines already queued are flushed in a batch before
/// the writer waits again. Cancellation is observed while a write is blocked
/// on a consumer that stopped reading; lines not yet flushed are lost.
pub async fn write_lines<W>(
    receiver: OutboundReceiver,
    writer: W,
    cancel: CancellationToken,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut rx = receiver.rx;
    let mut sink = FramedWrite::new(writer, LinesCodec::new());
    let mut written = 0u64;
    debug!("Outbound writer started");

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Outbound writer cancelled");
                return Ok(written);
            }
            next = rx.recv() => next,
        };
        let Some(line) = next else {
            break;
        };

        let delivered = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(written, "Outbound writer cancelled while blocked on the consumer");
                return Ok(written);
            }
            delivered = deliver(&mut sink, line, &mut rx) => delivered?,
        };
        written += delivered;
        trace!(written, "Flushed outbound lines");
    }

    info!("Outbound writer ended after {} lines", written);
    Ok(written)
}

/// Write `first` and every line already queued behind it, then flush.
async fn deliver<W>(
    sink: &mut FramedWrite<W, LinesCodec>,
    first: String,
    rx: &mut mpsc::Receiver<String>,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    sink.feed(first).await.map_err(codec_error)?;
    let mut delivered = 1u64;
    while let Ok(line) = rx.try_recv() {
        sink.feed(line).await.map_err(codec_error)?;
        delivered += 1;
    }
    SinkExt::<String>::flush(sink).await.map_err(codec_error)?;
    Ok(delivered)
}

fn codec_error(err: LinesCodecError) -> BridgeError {
    match err {
        LinesCodecError::Io(e) => BridgeError::Io(e),
        LinesCodecError::MaxLineLengthExceeded => {
            BridgeError::malformed("outbound", "", 0, "line exceeds maximum length")
        }
    }
}
