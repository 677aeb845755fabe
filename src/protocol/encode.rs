//! Message encoders
//!
//! Encoders write into a caller-owned `String` so that the acquisition loop
//! can reuse one allocation per message slot across ticks.

use std::fmt::Write;

use super::MessageType;
use crate::types::{FaceFrame, HandSide, HandState, SkeletonFrame};

/// The ping line: tag and separator with an empty payload.
pub const PING_LINE: &str = "P|";

/// Notice that a fresh color frame is in the shared color buffer.
pub const VIDEO_FRAME_NOTICE: &str = "V|";

/// Notice that a fresh depth frame is in the shared depth buffer.
pub const DEPTH_FRAME_NOTICE: &str = "D|";

pub fn encode_ping() -> &'static str {
    PING_LINE
}

/// Encode every joint that is not `NotTracked`, in ascending joint order.
///
/// Each joint contributes `id state px py pz qx qy qz qw ` (note the trailing
/// space). A frame without tracked joints encodes to `S|`.
pub fn encode_skeleton(frame: &SkeletonFrame, out: &mut String) {
    out.clear();
    out.push_str(MessageType::SkeletonFrame.prefix());
    for sample in frame.tracked() {
        let (p, q) = (&sample.position, &sample.orientation);
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "{} {} {} {} {} {} {} {} {} ",
            sample.joint.index(),
            sample.state.code(),
            p.x,
            p.y,
            p.z,
            q.x,
            q.y,
            q.z,
            q.w
        );
    }
}

pub fn encode_hand(side: HandSide, state: HandState, out: &mut String) {
    let kind = match side {
        HandSide::Left => MessageType::HandLeft,
        HandSide::Right => MessageType::HandRight,
    };
    out.clear();
    out.push_str(kind.prefix());
    let _ = write!(out, "{}", state.code());
}

/// Encode the 12 face fields, space separated, in wire order.
pub fn encode_face(face: &FaceFrame, out: &mut String) {
    out.clear();
    out.push_str(MessageType::FaceTrackingFrame.prefix());
    for (i, value) in face.to_fields().iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}", value);
    }
}

pub fn encode_error(message: &str, out: &mut String) {
    encode_text(MessageType::Error, message, out);
}

pub fn encode_debug(message: &str, out: &mut String) {
    encode_text(MessageType::Debug, message, out);
}

/// Allocating form of [`encode_error`] for cold paths.
pub fn error_line(message: &str) -> String {
    let mut out = String::with_capacity(message.len() + 2);
    encode_error(message, &mut out);
    out
}

/// Allocating form of [`encode_debug`] for cold paths.
pub fn debug_line(message: &str) -> String {
    let mut out = String::with_capacity(message.len() + 2);
    encode_debug(message, &mut out);
    out
}

/// Free text may contain spaces but never a line terminator.
fn encode_text(kind: MessageType, message: &str, out: &mut String) {
    out.clear();
    out.push_str(kind.prefix());
    out.extend(message.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }));
}
