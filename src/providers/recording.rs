//! Recorded body frames replayed from a YAML file
//!
//! A recording stands in for the sensor SDK. Joint, tracking and hand values
//! are stored as the SDK's raw integer codes and mapped through the canonical
//! `TryFrom` conversions when the file is loaded, so a bad code is reported
//! once at startup with the frame that carries it.
//!
//! ```yaml
//! devices: 1
//! tick_rate: 30
//! frames:
//!   - bodies:
//!       - tracked: true
//!         hand_left: 2
//!         hand_right: 3
//!         joints:
//!           - { joint: 0, state: 2, position: { x: 0.0, y: 0.1, z: 2.0 } }
//!           - joint: 3
//!             state: 2
//!             position: { x: 0.0, y: 0.7, z: 2.0 }
//!             orientation: { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
//!     color_fill: 128
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::provider::SensorSource;
use crate::shm::{COLOR_FRAME_SIZE, DEPTH_FRAME_SIZE};
use crate::types::{Body, HandState, JointReading, JointType, Quaternion, SensorFrame, TrackingState, Vector3};
use crate::{BridgeError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordingFile {
    #[serde(default = "default_devices")]
    devices: usize,
    tick_rate: f64,
    #[serde(default)]
    frames: Vec<RecordedFrame>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordedFrame {
    #[serde(default)]
    bodies: Vec<RecordedBody>,
    /// Fill byte for a synthetic color raster.
    #[serde(default)]
    color_fill: Option<u8>,
    /// Fill byte for a synthetic depth raster.
    #[serde(default)]
    depth_fill: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordedBody {
    tracked: bool,
    #[serde(default)]
    hand_left: u32,
    #[serde(default)]
    hand_right: u32,
    #[serde(default)]
    joints: Vec<RecordedJoint>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordedJoint {
    joint: u32,
    state: u32,
    position: Vector3,
    #[serde(default)]
    orientation: Quaternion,
}

fn default_devices() -> usize {
    1
}

/// Replays a recording at its tick rate.
pub struct RecordingSource {
    path: PathBuf,
    devices: usize,
    frames: Vec<SensorFrame>,
    position: usize,
    looping: bool,
    tick_rate: f64,
    /// Created on first use so construction does not need a runtime.
    interval: Option<Interval>,
}

impl RecordingSource {
    /// Load a recording from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| BridgeError::Recording { path: path.to_path_buf(), source })?;
        let source = Self::from_yaml(&text, path)?;
        info!(
            path = %path.display(),
            frames = source.frames.len(),
            tick_rate = source.tick_rate,
            "Opened recording"
        );
        Ok(source)
    }

    /// Parse a recording from YAML text. `origin` is only used in errors.
    pub fn from_yaml(text: &str, origin: impl AsRef<Path>) -> Result<Self> {
        let path = origin.as_ref().to_path_buf();
        let file: RecordingFile = serde_yaml_ng::from_str(text)
            .map_err(|e| BridgeError::RecordingFormat { path: path.clone(), details: e.to_string() })?;

        if !file.tick_rate.is_finite() || file.tick_rate <= 0.0 {
            return Err(BridgeError::RecordingFormat {
                path,
                details: format!("tick_rate must be a positive number, got {}", file.tick_rate),
            });
        }

        let frames = file
            .frames
            .into_iter()
            .enumerate()
            .map(|(index, frame)| {
                convert_frame(frame).map_err(|e| BridgeError::RecordingFormat {
                    path: path.clone(),
                    details: format!("frame {}: {}", index, e),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            path,
            devices: file.devices,
            frames,
            position: 0,
            looping: false,
            tick_rate: file.tick_rate,
            interval: None,
        })
    }

    /// Restart from the first frame instead of ending.
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn total_frames(&self) -> usize {
        self.frames.len()
    }

    /// Recording length in seconds.
    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.tick_rate
    }
}

fn convert_frame(frame: RecordedFrame) -> Result<SensorFrame> {
    let bodies = frame.bodies.into_iter().map(convert_body).collect::<Result<Vec<_>>>()?;
    Ok(SensorFrame {
        bodies,
        color: frame.color_fill.map(|fill| Arc::from(vec![fill; COLOR_FRAME_SIZE])),
        depth: frame.depth_fill.map(|fill| Arc::from(vec![fill; DEPTH_FRAME_SIZE])),
    })
}

fn convert_body(body: RecordedBody) -> Result<Body> {
    let joints = body
        .joints
        .into_iter()
        .map(|joint| {
            Ok(JointReading {
                joint: JointType::try_from(joint.joint)?,
                state: TrackingState::try_from(joint.state)?,
                position: joint.position,
                orientation: joint.orientation,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Body {
        tracked: body.tracked,
        joints,
        hand_left: HandState::try_from(body.hand_left)?,
        hand_right: HandState::try_from(body.hand_right)?,
    })
}

#[async_trait::async_trait]
impl SensorSource for RecordingSource {
    async fn device_count(&mut self) -> Result<usize> {
        Ok(self.devices)
    }

    async fn next_frame(&mut self) -> Result<Option<SensorFrame>> {
        if self.position >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                debug!("Reached end of recording");
                return Ok(None);
            }
            debug!("Looping recording");
            self.position = 0;
        }

        let tick_rate = self.tick_rate;
        let pacing = self.interval.get_or_insert_with(|| {
            let mut ticker = interval(Duration::from_secs_f64(1.0 / tick_rate));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        pacing.tick().await;

        let frame = self.frames[self.position].clone();
        self.position += 1;
        trace!(frame = self.position, total = self.frames.len(), bodies = frame.bodies.len(), "Replayed frame");
        Ok(Some(frame))
    }

    fn tick_rate(&self) -> f64 {
        self.tick_rate
    }
}
