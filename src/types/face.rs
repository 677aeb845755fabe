//! Face tracking frame

use super::Vector3;

/// Number of animation units carried by a face frame.
pub const ANIMATION_UNIT_COUNT: usize = 6;

/// Number of numeric fields in an encoded face frame.
pub const FACE_FIELD_COUNT: usize = ANIMATION_UNIT_COUNT + 6;

/// Face tracking result: animation units plus head pose.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaceFrame {
    pub animation_units: [f32; ANIMATION_UNIT_COUNT],
    /// Head position in meters.
    pub head_position: Vector3,
    /// Head rotation as Euler angles.
    pub head_rotation: Vector3,
}

impl FaceFrame {
    /// Fields in wire order.
    pub fn to_fields(&self) -> [f32; FACE_FIELD_COUNT] {
        let au = &self.animation_units;
        let (p, r) = (&self.head_position, &self.head_rotation);
        [au[0], au[1], au[2], au[3], au[4], au[5], p.x, p.y, p.z, r.x, r.y, r.z]
    }

    /// Build a frame from fields in wire order.
    pub fn from_fields(f: [f32; FACE_FIELD_COUNT]) -> Self {
        Self {
            animation_units: [f[0], f[1], f[2], f[3], f[4], f[5]],
            head_position: Vector3::new(f[6], f[7], f[8]),
            head_rotation: Vector3::new(f[9], f[10], f[11]),
        }
    }
}
