//! Source used when no sensor backend is attached

use crate::Result;
use crate::provider::SensorSource;
use crate::types::SensorFrame;

/// A source that sees no devices and produces no frames.
///
/// The bridge reports `No sensor device was found.` for it and stops.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbsentSensor;

#[async_trait::async_trait]
impl SensorSource for AbsentSensor {
    async fn device_count(&mut self) -> Result<usize> {
        Ok(0)
    }

    async fn next_frame(&mut self) -> Result<Option<SensorFrame>> {
        Ok(None)
    }

    fn tick_rate(&self) -> f64 {
        30.0
    }
}
