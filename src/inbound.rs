//! Inbound text channel
//!
//! The consumer writes one line per message. Ping echoes acknowledge the
//! watchdog; anything else is logged and reported back as a `Debug` message
//! but never acted upon.
//!
//! Lines are framed on raw bytes and decoded lossily, so invalid UTF-8 or an
//! oversized line costs that one line and never the session.

use std::io;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::outbound::OutboundSender;
use crate::protocol::{debug_line, is_ping};
use crate::watchdog::Watchdog;
use crate::{BridgeError, Result};

/// UTF-8 byte-order mark as decoded into a `char`.
pub const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// Longest inbound line accepted; longer lines are discarded.
pub const MAX_INBOUND_LINE: usize = 64 * 1024;

/// Unrecognized lines echoed back as `Debug` messages. Later ones are only
/// logged, so a chatty consumer cannot crowd data out of the outbound queue.
pub const MAX_ECHOED_UNRECOGNIZED: u64 = 16;

/// Counters reported when the inbound channel closes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InboundSummary {
    pub lines: u64,
    pub acknowledgements: u64,
    pub unrecognized: u64,
    /// Lines longer than [`MAX_INBOUND_LINE`], dropped unread.
    pub oversized: u64,
}

/// One framed inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundLine {
    /// Line text with the terminator removed. Invalid UTF-8 is replaced
    /// with U+FFFD.
    Text(String),
    /// A line that exceeded the length limit. Its bytes were discarded.
    Oversized,
}

/// Newline framing over raw bytes.
///
/// Unlike `LinesCodec` it never fails on content: `FramedRead` stops
/// yielding after a decoder error, which would end the inbound channel.
#[derive(Debug, Clone)]
pub struct InboundLineCodec {
    max_length: usize,
    /// Bytes already searched for a newline.
    next_index: usize,
    discarding: bool,
}

impl InboundLineCodec {
    pub fn new(max_length: usize) -> Self {
        Self { max_length: max_length.max(1), next_index: 0, discarding: false }
    }
}

impl Decoder for InboundLineCodec {
    type Item = InboundLine;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> io::Result<Option<InboundLine>> {
        loop {
            let newline = buf[self.next_index..].iter().position(|b| *b == b'\n').map(|i| i + self.next_index);

            if self.discarding {
                match newline {
                    Some(end) => {
                        buf.advance(end + 1);
                        self.next_index = 0;
                        self.discarding = false;
                        return Ok(Some(InboundLine::Oversized));
                    }
                    None => {
                        buf.clear();
                        self.next_index = 0;
                        return Ok(None);
                    }
                }
            }

            match newline {
                Some(end) if end <= self.max_length => {
                    let line = buf.split_to(end + 1);
                    self.next_index = 0;
                    return Ok(Some(InboundLine::Text(lossy_line(&line[..end]))));
                }
                Some(_) => {
                    self.discarding = true;
                }
                None if buf.len() > self.max_length => {
                    self.discarding = true;
                }
                None => {
                    self.next_index = buf.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> io::Result<Option<InboundLine>> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if self.discarding {
            self.discarding = false;
            buf.clear();
            return Ok(Some(InboundLine::Oversized));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        let line = buf.split();
        Ok(Some(InboundLine::Text(lossy_line(&line))))
    }
}

fn lossy_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Read lines until end of input or cancellation.
pub async fn read_lines<R>(
    reader: R,
    watchdog: Arc<Watchdog>,
    outbound: OutboundSender,
    cancel: CancellationToken,
) -> Result<InboundSummary>
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(reader, InboundLineCodec::new(MAX_INBOUND_LINE));
    let mut summary = InboundSummary::default();
    debug!("Inbound reader started");

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Inbound reader cancelled");
                return Ok(summary);
            }
            next = lines.next() => next,
        };

        let line = match next {
            Some(Ok(InboundLine::Text(line))) => line,
            Some(Ok(InboundLine::Oversized)) => {
                summary.oversized += 1;
                warn!(max = MAX_INBOUND_LINE, "Discarded oversized inbound line");
                continue;
            }
            Some(Err(e)) => return Err(BridgeError::Io(e)),
            None => break,
        };
        summary.lines += 1;

        let text = line.strip_prefix(BYTE_ORDER_MARK).unwrap_or(&line);
        if text.is_empty() {
            trace!("Skipping empty inbound line");
            continue;
        }

        if is_ping(text) {
            watchdog.acknowledge();
            summary.acknowledgements += 1;
            continue;
        }

        summary.unrecognized += 1;
        if summary.unrecognized <= MAX_ECHOED_UNRECOGNIZED {
            warn!(line = %text, "Unrecognized inbound line");
            outbound.try_send(debug_line(&format!("Unrecognized input: {}", text)))?;
            if summary.unrecognized == MAX_ECHOED_UNRECOGNIZED {
                warn!("Further unrecognized inbound lines are only logged at debug level");
            }
        } else {
            debug!(line = %text, total = summary.unrecognized, "Unrecognized inbound line");
        }
    }

    info!(lines = summary.lines, acknowledgements = summary.acknowledgements, "Inbound channel closed");
    Ok(summary)
}
