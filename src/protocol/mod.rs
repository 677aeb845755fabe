//! Line protocol between the bridge and its consumer.
//!
//! Every message is a single line of text: a one-character type tag, the `|`
//! separator, then a payload whose layout depends on the tag.
//!
//! ```text
//! S|0 2 0.01 -0.3 2.1 0 0 0 1 3 2 0.02 0.4 2.05 0 0.1 0 0.99
//! L|2
//! R|3
//! P|
//! E|Shared frame buffer 'KinectColorFrame' unavailable: mapping denied
//! ```
//!
//! Numbers are written with Rust's locale-independent `Display` for `f32`,
//! which always uses `.` as the decimal point and yields the shortest string
//! that parses back to the same value.
//!
//! ## Decoding
//!
//! ```rust
//! use bodylink::protocol::{Frame, MessageType, decode_hand};
//! use bodylink::types::HandState;
//!
//! let frame = Frame::parse("L|3")?;
//! assert_eq!(frame.kind, MessageType::HandLeft);
//! assert_eq!(decode_hand(frame.payload)?, HandState::Closed);
//! # Ok::<(), bodylink::BridgeError>(())
//! ```

mod decode;
mod encode;

pub use decode::{decode_face, decode_hand, decode_skeleton};
pub use encode::{
    DEPTH_FRAME_NOTICE, PING_LINE, VIDEO_FRAME_NOTICE, debug_line, encode_debug, encode_error,
    encode_face, encode_hand, encode_ping, encode_skeleton, error_line,
};

use crate::types::{FaceFrame, HandState};
use crate::{BridgeError, Result};

/// Separator between the type tag and the payload.
pub const SEPARATOR: char = '|';

/// Closed set of message kinds, identified on the wire by a single ASCII tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Error,
    Ping,
    FaceTrackingFrame,
    VideoFrame,
    DepthFrame,
    Debug,
    SkeletonFrame,
    HandLeft,
    HandRight,
}

impl MessageType {
    pub const ALL: [MessageType; 9] = [
        MessageType::Error,
        MessageType::Ping,
        MessageType::FaceTrackingFrame,
        MessageType::VideoFrame,
        MessageType::DepthFrame,
        MessageType::Debug,
        MessageType::SkeletonFrame,
        MessageType::HandLeft,
        MessageType::HandRight,
    ];

    /// The tag character written at the start of a line.
    pub const fn tag(self) -> char {
        match self {
            MessageType::Error => 'E',
            MessageType::Ping => 'P',
            MessageType::FaceTrackingFrame => 'F',
            MessageType::VideoFrame => 'V',
            MessageType::DepthFrame => 'D',
            MessageType::Debug => 'd',
            MessageType::SkeletonFrame => 'S',
            MessageType::HandLeft => 'L',
            MessageType::HandRight => 'R',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Whether `line` starts with this kind's tag.
    ///
    /// Only the first byte is inspected; an empty line matches nothing.
    pub fn matches(self, line: &str) -> bool {
        line.as_bytes().first() == Some(&(self.tag() as u8))
    }

    /// The `<tag>|` prefix shared by every line of this kind.
    pub(crate) fn prefix(self) -> &'static str {
        match self {
            MessageType::Error => "E|",
            MessageType::Ping => "P|",
            MessageType::FaceTrackingFrame => "F|",
            MessageType::VideoFrame => "V|",
            MessageType::DepthFrame => "D|",
            MessageType::Debug => "d|",
            MessageType::SkeletonFrame => "S|",
            MessageType::HandLeft => "L|",
            MessageType::HandRight => "R|",
        }
    }
}

/// Inspect the tag of a line without validating the rest of it.
///
/// An empty line or an unknown tag is a [`BridgeError::MalformedPayload`].
pub fn classify(line: &str) -> Result<MessageType> {
    let Some(first) = line.chars().next() else {
        return Err(BridgeError::malformed("classify", "", 0, "empty line"));
    };
    MessageType::from_tag(first).ok_or_else(|| {
        BridgeError::malformed("classify", first.to_string(), 0, "unknown message tag")
    })
}

pub fn is_error(line: &str) -> bool {
    MessageType::Error.matches(line)
}

pub fn is_ping(line: &str) -> bool {
    MessageType::Ping.matches(line)
}

pub fn is_face_tracking(line: &str) -> bool {
    MessageType::FaceTrackingFrame.matches(line)
}

pub fn is_video_frame(line: &str) -> bool {
    MessageType::VideoFrame.matches(line)
}

pub fn is_depth_frame(line: &str) -> bool {
    MessageType::DepthFrame.matches(line)
}

pub fn is_debug(line: &str) -> bool {
    MessageType::Debug.matches(line)
}

pub fn is_skeleton(line: &str) -> bool {
    MessageType::SkeletonFrame.matches(line)
}

pub fn is_hand_left(line: &str) -> bool {
    MessageType::HandLeft.matches(line)
}

pub fn is_hand_right(line: &str) -> bool {
    MessageType::HandRight.matches(line)
}

/// A validated line split into its tag and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub kind: MessageType,
    pub payload: &'a str,
}

impl<'a> Frame<'a> {
    /// Parse the tag, require the separator right after it, and return the rest.
    pub fn parse(line: &'a str) -> Result<Self> {
        let kind = classify(line)?;
        let bytes = line.as_bytes();
        match bytes.get(1) {
            Some(b) if *b == SEPARATOR as u8 => {}
            Some(_) => {
                return Err(BridgeError::malformed(
                    "framing",
                    truncate(line, 8),
                    1,
                    "expected '|' after the message tag",
                ));
            }
            None => {
                return Err(BridgeError::malformed("framing", line, 1, "missing separator"));
            }
        }
        // Tag and separator are both ASCII, so index 2 is a char boundary.
        Ok(Self { kind, payload: &line[2..] })
    }
}

/// A fully decoded inbound line.
///
/// Skeleton payloads are left raw so the caller can decode them into its own
/// reusable buffer with [`decode_skeleton`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message<'a> {
    Error(&'a str),
    Ping,
    FaceTracking(FaceFrame),
    VideoFrame,
    DepthFrame,
    Debug(&'a str),
    Skeleton(&'a str),
    HandLeft(HandState),
    HandRight(HandState),
}

impl<'a> Message<'a> {
    pub fn parse(line: &'a str) -> Result<Self> {
        let frame = Frame::parse(line)?;
        Ok(match frame.kind {
            MessageType::Error => Message::Error(frame.payload),
            MessageType::Ping => Message::Ping,
            MessageType::FaceTrackingFrame => Message::FaceTracking(decode_face(frame.payload)?),
            MessageType::VideoFrame => Message::VideoFrame,
            MessageType::DepthFrame => Message::DepthFrame,
            MessageType::Debug => Message::Debug(frame.payload),
            MessageType::SkeletonFrame => Message::Skeleton(frame.payload),
            MessageType::HandLeft => Message::HandLeft(decode_hand(frame.payload)?),
            MessageType::HandRight => Message::HandRight(decode_hand(frame.payload)?),
        })
    }

    pub fn kind(&self) -> MessageType {
        match self {
            Message::Error(_) => MessageType::Error,
            Message::Ping => MessageType::Ping,
            Message::FaceTracking(_) => MessageType::FaceTrackingFrame,
            Message::VideoFrame => MessageType::VideoFrame,
            Message::DepthFrame => MessageType::DepthFrame,
            Message::Debug(_) => MessageType::Debug,
            Message::Skeleton(_) => MessageType::SkeletonFrame,
            Message::HandLeft(_) => MessageType::HandLeft,
            Message::HandRight(_) => MessageType::HandRight,
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
