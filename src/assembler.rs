//! Per-tick message assembly
//!
//! The assembler owns the reusable skeleton buffer and the line scratch
//! strings. It belongs to the acquisition task alone.

use tracing::trace;

use crate::protocol::{encode_hand, encode_skeleton};
use crate::selector::select_nearest;
use crate::types::{Body, HandSide, SkeletonFrame, TrackingState};

/// Lines produced for one tick, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickLines<'a> {
    pub skeleton: &'a str,
    pub hand_left: &'a str,
    pub hand_right: &'a str,
}

impl<'a> TickLines<'a> {
    /// Skeleton, then left hand, then right hand.
    pub fn in_order(&self) -> [&'a str; 3] {
        [self.skeleton, self.hand_left, self.hand_right]
    }
}

#[derive(Debug, Default)]
pub struct FrameAssembler {
    skeleton: SkeletonFrame,
    skeleton_line: String,
    hand_left_line: String,
    hand_right_line: String,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the nearest subject and encode its messages.
    ///
    /// Returns `None` when no subject is tracked this tick.
    pub fn assemble(&mut self, bodies: &[Body]) -> Option<TickLines<'_>> {
        let subject = select_nearest(bodies)?;
        self.fill_skeleton(subject);

        encode_skeleton(&self.skeleton, &mut self.skeleton_line);
        encode_hand(HandSide::Left, subject.hand_left, &mut self.hand_left_line);
        encode_hand(HandSide::Right, subject.hand_right, &mut self.hand_right_line);

        trace!(joints = self.skeleton.tracked().count(), "Assembled tick");
        Some(TickLines {
            skeleton: &self.skeleton_line,
            hand_left: &self.hand_left_line,
            hand_right: &self.hand_right_line,
        })
    }

    /// The skeleton buffer as filled by the last call to `assemble`.
    pub fn skeleton(&self) -> &SkeletonFrame {
        &self.skeleton
    }

    // Inferred joints are not copied.
    fn fill_skeleton(&mut self, subject: &Body) {
        self.skeleton.reset();
        for reading in subject.joints.iter().filter(|r| r.state == TrackingState::Tracked) {
            self.skeleton.set(reading.joint, reading.state, reading.position, reading.orientation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Frame, decode_skeleton};
    use crate::types::{HandState, JointReading, JointType, Quaternion, Vector3};

    fn reading(joint: JointType, state: TrackingState, z: f32) -> JointReading {
        JointReading {
            joint,
            state,
            position: Vector3::new(0.1, 0.2, z),
            orientation: Quaternion::IDENTITY,
        }
    }

    #[test]
    fn emits_skeleton_then_left_then_right() {
        let body = Body {
            tracked: true,
            joints: vec![
                reading(JointType::Head, TrackingState::Tracked, 2.0),
                reading(JointType::SpineBase, TrackingState::Tracked, 2.0),
            ],
            hand_left: HandState::Open,
            hand_right: HandState::Closed,
        };
        let mut assembler = FrameAssembler::new();
        let lines = assembler.assemble(std::slice::from_ref(&body)).unwrap();

        assert_eq!(
            lines.in_order(),
            ["S|0 2 0.1 0.2 2 0 0 0 1 3 2 0.1 0.2 2 0 0 0 1 ", "L|2", "R|3"]
        );
    }

    #[test]
    fn inferred_joints_are_not_transmitted() {
        let body = Body {
            tracked: true,
            joints: vec![
                reading(JointType::SpineBase, TrackingState::Tracked, 1.0),
                reading(JointType::KneeLeft, TrackingState::Inferred, 1.0),
            ],
            ..Default::default()
        };
        let mut assembler = FrameAssembler::new();
        let line = assembler.assemble(&[body]).unwrap().skeleton.to_string();

        let mut decoded = SkeletonFrame::new();
        decode_skeleton(Frame::parse(&line).unwrap().payload, decoded.joints_mut()).unwrap();
        assert!(decoded.get(JointType::SpineBase).is_tracked());
        assert!(!decoded.get(JointType::KneeLeft).is_tracked());
    }

    #[test]
    fn untracked_tick_produces_nothing_and_buffer_resets_between_ticks() {
        let mut assembler = FrameAssembler::new();
        let first = Body {
            tracked: true,
            joints: vec![
                reading(JointType::SpineBase, TrackingState::Tracked, 1.0),
                reading(JointType::Head, TrackingState::Tracked, 1.0),
            ],
            ..Default::default()
        };
        assert!(assembler.assemble(&[first]).is_some());

        let second = Body {
            tracked: true,
            joints: vec![reading(JointType::SpineBase, TrackingState::Tracked, 1.0)],
            ..Default::default()
        };
        assembler.assemble(&[second]).unwrap();
        assert!(!assembler.skeleton().get(JointType::Head).is_tracked());

        let gone = Body { tracked: false, ..Default::default() };
        assert!(assembler.assemble(&[gone]).is_none());
    }
}
