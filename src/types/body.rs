//! Subject records supplied by the sensor collaborator
//!
//! A [`Body`] is only valid for the tick that delivered it. The bridge never
//! retains one past the acquisition callback.

use std::sync::Arc;

use super::{HandState, JointType, Quaternion, TrackingState, Vector3};

/// One joint as reported by the sensor for a subject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointReading {
    pub joint: JointType,
    pub state: TrackingState,
    pub position: Vector3,
    pub orientation: Quaternion,
}

/// A tracked (or untracked) human body for one acquisition tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub tracked: bool,
    /// Joint readings in whatever order the sensor delivers them.
    pub joints: Vec<JointReading>,
    pub hand_left: HandState,
    pub hand_right: HandState,
}

impl Body {
    pub fn joint(&self, joint: JointType) -> Option<&JointReading> {
        self.joints.iter().find(|reading| reading.joint == joint)
    }

    /// Position of the root joint, if the sensor reported it.
    pub fn root_position(&self) -> Option<Vector3> {
        self.joint(JointType::ROOT).map(|reading| reading.position)
    }
}

/// Everything one acquisition tick delivers.
#[derive(Debug, Clone, Default)]
pub struct SensorFrame {
    pub bodies: Vec<Body>,
    /// BGRA color raster, if the source captured one this tick.
    pub color: Option<Arc<[u8]>>,
    /// 16-bit depth raster, if the source captured one this tick.
    pub depth: Option<Arc<[u8]>>,
}

impl SensorFrame {
    pub fn from_bodies(bodies: Vec<Body>) -> Self {
        Self { bodies, color: None, depth: None }
    }
}
