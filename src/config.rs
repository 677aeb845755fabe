//! Runtime configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::shm::{COLOR_REGION_NAME, DEPTH_REGION_NAME};

/// Settings for one bridge run.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Interval between outbound pings.
    pub ping_interval: Duration,
    /// Unacknowledged pings tolerated before the watchdog fires.
    pub max_missed_pings: u32,
    /// Capacity of the outbound line queue.
    pub outbound_capacity: usize,
    /// Copy rasters supplied by the source into the shared frame buffers.
    pub write_rasters: bool,
    /// Directory for the shared region backing files (Unix). `None` uses
    /// [`shm::default_dir`](crate::shm::default_dir).
    pub shm_dir: Option<PathBuf>,
    pub color_region_name: String,
    pub depth_region_name: String,
    /// Consecutive source errors before acquisition gives up.
    pub max_source_errors: u32,
    /// How long a clean shutdown waits for queued lines to reach the consumer.
    pub drain_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(10),
            max_missed_pings: 2,
            outbound_capacity: 64,
            write_rasters: false,
            shm_dir: None,
            color_region_name: COLOR_REGION_NAME.to_string(),
            depth_region_name: DEPTH_REGION_NAME.to_string(),
            max_source_errors: 10,
            drain_timeout: Duration::from_secs(2),
        }
    }
}
