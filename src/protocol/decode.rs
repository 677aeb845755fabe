//! Payload decoders
//!
//! Decoders take the payload returned by [`Frame::parse`](super::Frame::parse),
//! never the whole line.

use std::str::FromStr;

use crate::types::{
    FACE_FIELD_COUNT, FaceFrame, HandState, JOINT_COUNT, JointSample, JointType, Quaternion,
    TrackingState, Vector3, reset_joints,
};
use crate::{BridgeError, Result};

/// Tokens per joint group: id, state, 3 position, 4 orientation.
const SKELETON_RUN_LEN: usize = 9;

/// Decode a skeleton payload into `joints`, indexed by joint id.
///
/// `joints` must hold exactly [`JOINT_COUNT`] samples. Every joint is reset to
/// `NotTracked` before the groups are applied, so joints absent from the
/// payload read as untracked. The destination is left untouched on any error.
/// A trailing group with fewer than nine tokens is ignored.
pub fn decode_skeleton(payload: &str, joints: &mut [JointSample]) -> Result<()> {
    if joints.len() != JOINT_COUNT {
        return Err(BridgeError::InvalidBufferSize { expected: JOINT_COUNT, actual: joints.len() });
    }

    let mut staged = [JointSample::untracked(JointType::SpineBase); JOINT_COUNT];
    staged.copy_from_slice(joints);
    reset_joints(&mut staged);

    let mut tokens = payload.split_whitespace();
    let mut run = [""; SKELETON_RUN_LEN];
    let mut position = 0;

    'runs: loop {
        for slot in run.iter_mut() {
            match tokens.next() {
                Some(token) => *slot = token,
                None => break 'runs,
            }
        }

        let id: usize = parse_field("skeleton joint id", run[0], position)?;
        let joint = JointType::from_index(id).ok_or_else(|| {
            BridgeError::decode(
                "skeleton",
                format!("joint id {} at position {} exceeds joint count {}", id, position, JOINT_COUNT),
            )
        })?;
        let state_code: u32 = parse_field("skeleton tracking state", run[1], position + 1)?;
        let state = TrackingState::try_from(state_code)?;

        let mut values = [0f32; SKELETON_RUN_LEN - 2];
        for (offset, value) in values.iter_mut().enumerate() {
            let at = offset + 2;
            *value = parse_field("skeleton joint value", run[at], position + at)?;
        }

        staged[joint.index()] = JointSample {
            joint,
            state,
            position: Vector3::new(values[0], values[1], values[2]),
            orientation: Quaternion::new(values[3], values[4], values[5], values[6]),
        };
        position += SKELETON_RUN_LEN;
    }

    joints.copy_from_slice(&staged);
    Ok(())
}

/// Decode a face payload of exactly twelve numbers.
pub fn decode_face(payload: &str) -> Result<FaceFrame> {
    let mut fields = [0f32; FACE_FIELD_COUNT];
    let mut count = 0;

    for (position, token) in payload.split_whitespace().enumerate() {
        if position >= FACE_FIELD_COUNT {
            return Err(BridgeError::malformed(
                "face tracking",
                token,
                position,
                format!("expected exactly {} fields", FACE_FIELD_COUNT),
            ));
        }
        fields[position] = parse_field("face tracking", token, position)?;
        count += 1;
    }

    if count < FACE_FIELD_COUNT {
        return Err(BridgeError::malformed(
            "face tracking",
            "",
            count,
            format!("expected {} fields, found {}", FACE_FIELD_COUNT, count),
        ));
    }

    Ok(FaceFrame::from_fields(fields))
}

/// Decode a hand payload: a single integer hand state code.
pub fn decode_hand(payload: &str) -> Result<HandState> {
    let token = payload.trim();
    let code: u32 = parse_field("hand state", token, 0)?;
    HandState::try_from(code)
}

fn parse_field<T: FromStr>(context: &str, token: &str, position: usize) -> Result<T> {
    token
        .parse()
        .map_err(|_| BridgeError::malformed(context, token, position, "not a valid number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Frame, encode_face, encode_skeleton};
    use crate::types::SkeletonFrame;
    use proptest::prelude::*;

    fn sample_payload() -> &'static str {
        "3 2 0.1 0.7 2.2 0 0 0 1 7 2 -0.3 0.1 2 0.1 0.2 0.3 0.9 "
    }

    #[test]
    fn decodes_groups_into_their_slots() {
        let mut frame = SkeletonFrame::new();
        decode_skeleton(sample_payload(), frame.joints_mut()).unwrap();

        let head = frame.get(JointType::Head);
        assert_eq!(head.state, TrackingState::Tracked);
        assert_eq!(head.position, Vector3::new(0.1, 0.7, 2.2));
        assert_eq!(head.orientation, Quaternion::IDENTITY);

        let hand = frame.get(JointType::HandLeft);
        assert_eq!(hand.orientation, Quaternion::new(0.1, 0.2, 0.3, 0.9));
        assert_eq!(frame.tracked().count(), 2);
    }

    #[test]
    fn previous_state_is_reset() {
        let mut frame = SkeletonFrame::new();
        decode_skeleton(sample_payload(), frame.joints_mut()).unwrap();
        decode_skeleton("", frame.joints_mut()).unwrap();
        assert_eq!(frame.tracked().count(), 0);
    }

    #[test]
    fn tolerates_extra_whitespace() {
        let mut frame = SkeletonFrame::new();
        decode_skeleton("  3  2 0.1 0.7 2.2 0 0 0 1   \t", frame.joints_mut()).unwrap();
        assert!(frame.get(JointType::Head).is_tracked());
    }

    #[test]
    fn wrong_buffer_size_fails_without_writing() {
        for len in [0usize, 24, 26] {
            let mut joints = vec![JointSample::untracked(JointType::Head); len];
            if let Some(first) = joints.first_mut() {
                first.state = TrackingState::Tracked;
            }
            let before = joints.clone();
            let err = decode_skeleton(sample_payload(), &mut joints).unwrap_err();
            assert!(matches!(err, BridgeError::InvalidBufferSize { expected: 25, actual } if actual == len));
            assert_eq!(joints, before);
        }
    }

    #[test]
    fn joint_id_out_of_range_is_decode_error() {
        let mut frame = SkeletonFrame::new();
        let err = decode_skeleton("25 2 0 0 0 0 0 0 1", frame.joints_mut()).unwrap_err();
        assert!(matches!(err, BridgeError::Decode { .. }));
    }

    #[test]
    fn non_numeric_token_reports_position() {
        let mut frame = SkeletonFrame::new();
        frame.set(JointType::Neck, TrackingState::Tracked, Vector3::new(1.0, 1.0, 1.0), Quaternion::IDENTITY);
        let before = frame.clone();

        let err = decode_skeleton("3 2 0.1 abc 2.2 0 0 0 1", frame.joints_mut()).unwrap_err();
        match err {
            BridgeError::MalformedPayload { token, position, .. } => {
                assert_eq!(token, "abc");
                assert_eq!(position, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(frame, before);
    }

    #[test]
    fn locale_comma_is_rejected() {
        let mut frame = SkeletonFrame::new();
        let err = decode_skeleton("3 2 0,1 0 0 0 0 0 1", frame.joints_mut()).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedPayload { .. }));
    }

    #[test]
    fn trailing_partial_group_is_ignored() {
        let mut frame = SkeletonFrame::new();
        decode_skeleton("3 2 0.1 0.7 2.2 0 0 0 1 4 2 0.5", frame.joints_mut()).unwrap();
        assert_eq!(frame.tracked().count(), 1);
    }

    #[test]
    fn face_with_eleven_fields_is_malformed() {
        let err = decode_face("0.1 0.2 0.3 0.4 0.5 0.6 0 0.5 1.8 10 -5.5").unwrap_err();
        assert!(matches!(err, BridgeError::MalformedPayload { position: 11, .. }));
    }

    #[test]
    fn face_with_thirteen_fields_is_malformed() {
        let err = decode_face("1 2 3 4 5 6 7 8 9 10 11 12 13").unwrap_err();
        assert!(matches!(err, BridgeError::MalformedPayload { position: 12, .. }));
    }

    #[test]
    fn face_roundtrip_through_line() {
        let face = FaceFrame {
            animation_units: [0.1, -0.2, 0.3, 0.0, 1.0, -1.0],
            head_position: Vector3::new(0.02, 0.41, 1.75),
            head_rotation: Vector3::new(3.5, -12.25, 0.5),
        };
        let mut line = String::new();
        encode_face(&face, &mut line);
        let frame = Frame::parse(&line).unwrap();
        assert_eq!(decode_face(frame.payload).unwrap(), face);
    }

    #[test]
    fn hand_payloads() {
        assert_eq!(decode_hand("3").unwrap(), HandState::Closed);
        assert!(matches!(decode_hand("x"), Err(BridgeError::MalformedPayload { .. })));
        assert!(matches!(decode_hand("9"), Err(BridgeError::Decode { .. })));
        assert!(matches!(decode_hand(""), Err(BridgeError::MalformedPayload { .. })));
    }

    fn arb_finite() -> impl Strategy<Value = f32> {
        prop::num::f32::NORMAL | prop::num::f32::ZERO | prop::num::f32::SUBNORMAL
    }

    proptest! {
        #[test]
        fn skeleton_roundtrip_preserves_tracked_joints(
            mask in prop::collection::vec(any::<bool>(), JOINT_COUNT),
            values in prop::collection::vec(prop::array::uniform7(arb_finite()), JOINT_COUNT),
        ) {
            let mut source = SkeletonFrame::new();
            for (index, joint) in JointType::ALL.iter().enumerate() {
                let v = values[index];
                let state = if mask[index] { TrackingState::Tracked } else { TrackingState::NotTracked };
                source.set(
                    *joint,
                    state,
                    Vector3::new(v[0], v[1], v[2]),
                    Quaternion::new(v[3], v[4], v[5], v[6]),
                );
            }

            let mut line = String::new();
            encode_skeleton(&source, &mut line);
            let frame = Frame::parse(&line).unwrap();

            let mut decoded = SkeletonFrame::new();
            decode_skeleton(frame.payload, decoded.joints_mut()).unwrap();

            for joint in JointType::ALL {
                let expected = source.get(joint);
                let actual = decoded.get(joint);
                if expected.is_tracked() {
                    prop_assert_eq!(actual, expected);
                } else {
                    prop_assert_eq!(actual.state, TrackingState::NotTracked);
                }
            }
        }
    }
}
