//! Core data types shared by the codec, the selector and the transport.
//!
//! The bridge owns a single canonical copy of every sensor enumeration:
//! - [`JointType`] enumerates the 25 skeletal landmarks by wire id
//! - [`TrackingState`] is the per-joint confidence
//! - [`HandState`] is the per-hand pose
//!
//! Raw integer codes coming from the sensor SDK are converted through the
//! `TryFrom<u32>` implementations, which reject unknown codes instead of
//! guessing.
//!
//! ## Usage Example
//!
//! ```rust
//! use bodylink::types::{JointType, Quaternion, SkeletonFrame, TrackingState, Vector3};
//!
//! let mut frame = SkeletonFrame::new();
//! frame.set(JointType::Head, TrackingState::Tracked, Vector3::new(0.0, 0.7, 2.1), Quaternion::IDENTITY);
//! assert_eq!(frame.tracked().count(), 1);
//! ```

mod body;
mod face;
mod hand;
mod joint;

pub use body::{Body, JointReading, SensorFrame};
pub use face::{ANIMATION_UNIT_COUNT, FACE_FIELD_COUNT, FaceFrame};
pub use hand::{HandSide, HandState};
pub use joint::{JOINT_COUNT, JointSample, JointType, Quaternion, SkeletonFrame, TrackingState, Vector3};

pub(crate) use joint::reset_joints;
