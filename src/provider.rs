//! Sensor collaborator boundary

use crate::Result;
use crate::types::SensorFrame;

/// A source of per-tick body data.
///
/// Implementations pace themselves: `next_frame` resolves when the next
/// sensor frame is available. Calls are never overlapped, so a source sees
/// strictly serialized delivery.
#[async_trait::async_trait]
pub trait SensorSource: Send + 'static {
    /// Number of sensor devices the source can see.
    ///
    /// Checked once at startup; zero aborts the bridge.
    async fn device_count(&mut self) -> Result<usize>;

    /// Get the next frame
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - New frame available
    /// - `Ok(None)` - Source ended (normal termination)
    /// - `Err(e)` - Error occurred; the caller may retry
    async fn next_frame(&mut self) -> Result<Option<SensorFrame>>;

    /// Native frame rate in Hz.
    fn tick_rate(&self) -> f64;
}
