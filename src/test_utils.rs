//! Test utilities: synthetic subjects and a scripted sensor source
//!
//! Shared by unit tests, integration tests and benchmarks (the latter two via
//! the `benchmark` feature).

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;

use crate::Result;
use crate::provider::SensorSource;
use crate::types::{Body, HandState, JointReading, JointType, Quaternion, SensorFrame, TrackingState, Vector3};

/// A tracked body with every joint tracked, its root `distance` meters in
/// front of the sensor.
pub fn tracked_body(distance: f32, hand_left: HandState, hand_right: HandState) -> Body {
    let joints = JointType::ALL
        .iter()
        .enumerate()
        .map(|(index, joint)| JointReading {
            joint: *joint,
            state: TrackingState::Tracked,
            position: Vector3::new(0.01 * index as f32, 0.05 * index as f32, distance),
            orientation: Quaternion::IDENTITY,
        })
        .collect();
    Body { tracked: true, joints, hand_left, hand_right }
}

/// A body the sensor has lost, still carrying stale joint data.
pub fn untracked_body(distance: f32) -> Body {
    Body { tracked: false, ..tracked_body(distance, HandState::NotTracked, HandState::NotTracked) }
}

/// A full sensor slot: `count` bodies at increasing distance, every other
/// one untracked, as the SDK reports six slots per frame.
pub fn crowded_frame(count: usize) -> SensorFrame {
    let bodies = (0..count)
        .map(|i| {
            let distance = 1.0 + 0.5 * i as f32;
            if i % 2 == 0 {
                tracked_body(distance, HandState::Open, HandState::Closed)
            } else {
                untracked_body(distance)
            }
        })
        .collect();
    SensorFrame::from_bodies(bodies)
}

/// Source that replays a fixed script without pacing, then ends.
pub struct ScriptedSource {
    script: VecDeque<Result<SensorFrame>>,
    devices: usize,
    pending: bool,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<SensorFrame>>) -> Self {
        Self { script: script.into(), devices: 1, pending: false }
    }

    /// A source whose first frame never arrives.
    pub fn pending() -> Self {
        Self { script: VecDeque::new(), devices: 1, pending: true }
    }

    pub fn with_devices(mut self, devices: usize) -> Self {
        self.devices = devices;
        self
    }
}

#[async_trait::async_trait]
impl SensorSource for ScriptedSource {
    async fn device_count(&mut self) -> Result<usize> {
        Ok(self.devices)
    }

    async fn next_frame(&mut self) -> Result<Option<SensorFrame>> {
        if self.pending {
            std::future::pending::<()>().await;
        }
        self.script.pop_front().transpose()
    }

    fn tick_rate(&self) -> f64 {
        30.0
    }
}
