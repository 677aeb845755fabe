//! Shared frame buffers for raster data
//!
//! Raster frames are too large for the line protocol, so they travel through
//! two named, fixed-size shared memory regions. Both processes create-or-open
//! the same names; neither owns the region's lifetime.
//!
//! - Unix: a file under `/dev/shm` (or the temp dir) mapped with `memmap2`
//! - Windows: a pagefile-backed named file mapping
//!
//! Writes and reads are plain byte copies with no synchronization. A reader
//! racing a writer may see a torn frame, which the next frame supersedes.

use std::path::Path;

use tracing::{debug, trace};

use crate::{BridgeError, Result};

mod reader;
mod writer;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix::Mapping;
#[cfg(unix)]
pub use unix::default_dir;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use self::windows::Mapping;

pub use reader::{FrameBufferReader, RasterReader};
pub use writer::RasterWriter;

/// Raster width in pixels.
pub const FRAME_WIDTH: usize = 640;
/// Raster height in pixels.
pub const FRAME_HEIGHT: usize = 480;
/// BGRA color pixels.
pub const COLOR_BYTES_PER_PIXEL: usize = 4;
/// 16-bit depth pixels.
pub const DEPTH_BYTES_PER_PIXEL: usize = 2;

pub const COLOR_FRAME_SIZE: usize = FRAME_WIDTH * FRAME_HEIGHT * COLOR_BYTES_PER_PIXEL;
pub const DEPTH_FRAME_SIZE: usize = FRAME_WIDTH * FRAME_HEIGHT * DEPTH_BYTES_PER_PIXEL;

/// Well-known name of the color region.
pub const COLOR_REGION_NAME: &str = "KinectColorFrame";
/// Well-known name of the depth region.
pub const DEPTH_REGION_NAME: &str = "DepthColorFrame";

/// A named shared memory region of fixed size.
///
/// Dropping the region unmaps it. The backing object survives for as long as
/// any other process still has it open.
pub struct SharedRegion {
    name: String,
    size: usize,
    mapping: Option<Mapping>,
}

impl SharedRegion {
    /// Create the named region if absent, or open the existing one.
    pub fn open_or_create(name: &str, size: usize) -> Result<Self> {
        Self::open_or_create_in(None, name, size)
    }

    /// Like [`open_or_create`](Self::open_or_create) with an explicit backing
    /// directory. The directory only applies to Unix; Windows mappings live
    /// in the kernel namespace.
    pub fn open_or_create_in(dir: Option<&Path>, name: &str, size: usize) -> Result<Self> {
        validate_name(name)?;
        if size == 0 {
            return Err(BridgeError::transport_unavailable(name, "region size must be non-zero"));
        }

        let mapping = Mapping::open_or_create(dir, name, size)?;
        debug!(region = name, size, "Mapped shared region");
        Ok(Self { name: name.to_string(), size, mapping: Some(mapping) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Region size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_open(&self) -> bool {
        self.mapping.is_some()
    }

    /// Copy a full frame into the region at offset 0.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.size {
            return Err(BridgeError::InvalidBufferSize { expected: self.size, actual: bytes.len() });
        }
        let mapping = self
            .mapping
            .as_mut()
            .ok_or_else(|| BridgeError::transport_unavailable(&self.name, "region is closed"))?;
        mapping.as_mut_slice().copy_from_slice(bytes);
        trace!(region = %self.name, bytes = bytes.len(), "Wrote frame");
        Ok(())
    }

    /// Copy the whole region into `dst`, which must match the region size.
    pub fn read_into(&self, dst: &mut [u8]) -> Result<()> {
        if dst.len() != self.size {
            return Err(BridgeError::InvalidBufferSize { expected: self.size, actual: dst.len() });
        }
        let mapping = self
            .mapping
            .as_ref()
            .ok_or_else(|| BridgeError::transport_unavailable(&self.name, "region is closed"))?;
        dst.copy_from_slice(mapping.as_slice());
        Ok(())
    }

    /// Unmap the region. Calling this more than once is a no-op.
    pub fn close(&mut self) {
        if self.mapping.take().is_some() {
            debug!(region = %self.name, "Unmapped shared region");
        }
    }
}

impl std::fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegion")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("open", &self.is_open())
            .finish()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BridgeError::transport_unavailable(name, "region name is empty"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(BridgeError::transport_unavailable(
            name,
            "region name must not contain path separators or NUL",
        ));
    }
    Ok(())
}
