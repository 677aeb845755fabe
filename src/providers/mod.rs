//! Sensor source implementations

pub mod absent;
pub mod recording;

pub use absent::AbsentSensor;
pub use recording::RecordingSource;
