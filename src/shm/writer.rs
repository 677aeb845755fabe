//! Producer-side raster writes

use std::path::Path;

use tracing::info;

use super::{COLOR_FRAME_SIZE, DEPTH_FRAME_SIZE, SharedRegion};
use crate::Result;

/// Owns the color and depth regions on the producer side.
#[derive(Debug)]
pub struct RasterWriter {
    color: SharedRegion,
    depth: SharedRegion,
}

impl RasterWriter {
    /// Create-or-open both regions at their fixed sizes.
    pub fn open(dir: Option<&Path>, color_name: &str, depth_name: &str) -> Result<Self> {
        let color = SharedRegion::open_or_create_in(dir, color_name, COLOR_FRAME_SIZE)?;
        let depth = SharedRegion::open_or_create_in(dir, depth_name, DEPTH_FRAME_SIZE)?;
        info!(color = color_name, depth = depth_name, "Raster buffers ready");
        Ok(Self { color, depth })
    }

    /// Copy a full BGRA frame into the color region.
    pub fn write_color(&mut self, bytes: &[u8]) -> Result<()> {
        self.color.write(bytes)
    }

    /// Copy a full 16-bit depth frame into the depth region.
    pub fn write_depth(&mut self, bytes: &[u8]) -> Result<()> {
        self.depth.write(bytes)
    }

    pub fn close(&mut self) {
        self.color.close();
        self.depth.close();
    }
}
