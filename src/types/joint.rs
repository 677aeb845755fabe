//! Skeletal joint enumeration and the reusable skeleton buffer

use serde::{Deserialize, Serialize};

use crate::{BridgeError, Result};

/// Number of joints in a skeleton.
pub const JOINT_COUNT: usize = 25;

/// The named skeletal landmarks, indexed by their wire id.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JointType {
    SpineBase = 0,
    SpineMid = 1,
    Neck = 2,
    Head = 3,
    ShoulderLeft = 4,
    ElbowLeft = 5,
    WristLeft = 6,
    HandLeft = 7,
    ShoulderRight = 8,
    ElbowRight = 9,
    WristRight = 10,
    HandRight = 11,
    HipLeft = 12,
    KneeLeft = 13,
    AnkleLeft = 14,
    FootLeft = 15,
    HipRight = 16,
    KneeRight = 17,
    AnkleRight = 18,
    FootRight = 19,
    /// Between the shoulders on the spine.
    SpineShoulder = 20,
    HandTipLeft = 21,
    ThumbLeft = 22,
    HandTipRight = 23,
    ThumbRight = 24,
}

impl JointType {
    /// All joints in ascending id order.
    pub const ALL: [JointType; JOINT_COUNT] = [
        JointType::SpineBase,
        JointType::SpineMid,
        JointType::Neck,
        JointType::Head,
        JointType::ShoulderLeft,
        JointType::ElbowLeft,
        JointType::WristLeft,
        JointType::HandLeft,
        JointType::ShoulderRight,
        JointType::ElbowRight,
        JointType::WristRight,
        JointType::HandRight,
        JointType::HipLeft,
        JointType::KneeLeft,
        JointType::AnkleLeft,
        JointType::FootLeft,
        JointType::HipRight,
        JointType::KneeRight,
        JointType::AnkleRight,
        JointType::FootRight,
        JointType::SpineShoulder,
        JointType::HandTipLeft,
        JointType::ThumbLeft,
        JointType::HandTipRight,
        JointType::ThumbRight,
    ];

    /// The root joint used for distance measurements.
    pub const ROOT: JointType = JointType::SpineBase;

    /// Wire id / array index of this joint.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a joint by its wire id.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl TryFrom<u32> for JointType {
    type Error = BridgeError;

    fn try_from(value: u32) -> Result<Self> {
        Self::from_index(value as usize).ok_or_else(|| {
            BridgeError::decode(
                "joint type",
                format!("joint id {} out of range (0..{})", value, JOINT_COUNT),
            )
        })
    }
}

/// Per-joint tracking confidence reported by the sensor.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackingState {
    #[default]
    NotTracked = 0,
    Inferred = 1,
    Tracked = 2,
}

impl TrackingState {
    /// Integer code used on the wire.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u32> for TrackingState {
    type Error = BridgeError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(TrackingState::NotTracked),
            1 => Ok(TrackingState::Inferred),
            2 => Ok(TrackingState::Tracked),
            _ => Err(BridgeError::decode(
                "tracking state",
                format!("unknown tracking state code {}", value),
            )),
        }
    }
}

/// Three-component vector in sensor space (meters), or Euler angles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared distance from the sensor origin.
    pub fn length_squared(&self) -> f64 {
        let (x, y, z) = (self.x as f64, self.y as f64, self.z as f64);
        x * x + y * y + z * z
    }
}

/// Unit quaternion describing a joint orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One skeletal joint's state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSample {
    pub joint: JointType,
    pub state: TrackingState,
    pub position: Vector3,
    pub orientation: Quaternion,
}

impl JointSample {
    /// An untracked sample for the given joint.
    pub fn untracked(joint: JointType) -> Self {
        Self {
            joint,
            state: TrackingState::NotTracked,
            position: Vector3::default(),
            orientation: Quaternion::IDENTITY,
        }
    }

    pub fn is_tracked(&self) -> bool {
        self.state != TrackingState::NotTracked
    }
}

/// Skeleton buffer holding one sample per joint, indexed by joint id.
///
/// A single instance is reused across ticks: it is reset to all-untracked and
/// then selectively filled from the chosen subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonFrame {
    joints: [JointSample; JOINT_COUNT],
}

impl SkeletonFrame {
    pub fn new() -> Self {
        Self { joints: JointType::ALL.map(JointSample::untracked) }
    }

    /// Mark every joint as not tracked.
    pub fn reset(&mut self) {
        reset_joints(&mut self.joints);
    }

    pub fn joints(&self) -> &[JointSample] {
        &self.joints
    }

    pub fn joints_mut(&mut self) -> &mut [JointSample] {
        &mut self.joints
    }

    pub fn get(&self, joint: JointType) -> &JointSample {
        &self.joints[joint.index()]
    }

    /// Overwrite the sample of one joint.
    pub fn set(
        &mut self,
        joint: JointType,
        state: TrackingState,
        position: Vector3,
        orientation: Quaternion,
    ) {
        self.joints[joint.index()] = JointSample { joint, state, position, orientation };
    }

    /// Samples whose state is not `NotTracked`, in ascending joint order.
    pub fn tracked(&self) -> impl Iterator<Item = &JointSample> {
        self.joints.iter().filter(|j| j.is_tracked())
    }
}

impl Default for SkeletonFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Reset a joint slice to all-untracked, restoring each slot's joint id.
pub(crate) fn reset_joints(joints: &mut [JointSample]) {
    for (index, sample) in joints.iter_mut().enumerate() {
        sample.state = TrackingState::NotTracked;
        if let Some(joint) = JointType::from_index(index) {
            sample.joint = joint;
        }
    }
}
