//! Consumer-side frame reads

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::{COLOR_FRAME_SIZE, COLOR_REGION_NAME, DEPTH_FRAME_SIZE, DEPTH_REGION_NAME, SharedRegion};

/// Reads one named frame buffer into a reusable local copy.
///
/// The region is opened lazily. Any mapping failure yields `None` ("frame
/// temporarily unavailable") and the open is retried on the next call, so a
/// consumer that starts before the producer simply sees `None` until the
/// region exists.
#[derive(Debug)]
pub struct FrameBufferReader {
    name: String,
    dir: Option<PathBuf>,
    region: Option<SharedRegion>,
    buffer: Vec<u8>,
}

impl FrameBufferReader {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self { name: name.into(), dir: None, region: None, buffer: vec![0; size] }
    }

    /// Use `dir` for the backing files (Unix only).
    pub fn with_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy the current frame and return it, or `None` if the region cannot
    /// be mapped right now.
    pub fn read_frame(&mut self) -> Option<&[u8]> {
        if self.region.is_none() {
            match SharedRegion::open_or_create_in(self.dir.as_deref(), &self.name, self.buffer.len()) {
                Ok(region) => self.region = Some(region),
                Err(e) => {
                    debug!(region = %self.name, error = %e, "Frame buffer unavailable");
                    return None;
                }
            }
        }

        let region = self.region.as_ref()?;
        if let Err(e) = region.read_into(&mut self.buffer) {
            debug!(region = %self.name, error = %e, "Frame read failed, reopening next time");
            self.region = None;
            return None;
        }

        trace!(region = %self.name, bytes = self.buffer.len(), "Read frame");
        Some(&self.buffer)
    }

    /// Release the mapping. The next read reopens it.
    pub fn close(&mut self) {
        if let Some(mut region) = self.region.take() {
            region.close();
        }
    }
}

/// The two well-known raster buffers as seen by a consumer.
#[derive(Debug)]
pub struct RasterReader {
    color: FrameBufferReader,
    depth: FrameBufferReader,
}

impl RasterReader {
    pub fn new(dir: Option<&Path>) -> Self {
        Self::with_names(dir, COLOR_REGION_NAME, DEPTH_REGION_NAME)
    }

    pub fn with_names(dir: Option<&Path>, color_name: &str, depth_name: &str) -> Self {
        let mut color = FrameBufferReader::new(color_name, COLOR_FRAME_SIZE);
        let mut depth = FrameBufferReader::new(depth_name, DEPTH_FRAME_SIZE);
        if let Some(dir) = dir {
            color = color.with_dir(dir);
            depth = depth.with_dir(dir);
        }
        Self { color, depth }
    }

    /// Latest BGRA color frame, 640x480x4 bytes.
    pub fn video_frame(&mut self) -> Option<&[u8]> {
        self.color.read_frame()
    }

    /// Latest 16-bit depth frame, 640x480x2 bytes.
    pub fn depth_frame(&mut self) -> Option<&[u8]> {
        self.depth.read_frame()
    }
}
