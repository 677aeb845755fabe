//! File-backed mapping used on Unix

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};
use tracing::trace;

use crate::{BridgeError, Result};

/// Directory holding the backing files when none is configured.
///
/// `/dev/shm` keeps the pages in RAM on Linux; other Unixes fall back to the
/// temp dir.
pub fn default_dir() -> PathBuf {
    let shm = Path::new("/dev/shm");
    if shm.is_dir() { shm.to_path_buf() } else { std::env::temp_dir() }
}

pub(super) struct Mapping {
    map: MmapMut,
}

impl Mapping {
    pub(super) fn open_or_create(dir: Option<&Path>, name: &str, size: usize) -> Result<Self> {
        let path = match dir {
            Some(dir) => dir.join(name),
            None => default_dir().join(name),
        };
        trace!(path = %path.display(), size, "Opening shared region file");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| BridgeError::transport_io(name, format!("cannot open {}", path.display()), e))?;

        let len = file
            .metadata()
            .map_err(|e| BridgeError::transport_io(name, "cannot stat backing file", e))?
            .len();

        if len == 0 {
            file.set_len(size as u64)
                .map_err(|e| BridgeError::transport_io(name, "cannot size backing file", e))?;
        } else if len != size as u64 {
            return Err(BridgeError::transport_unavailable(
                name,
                format!("existing region is {} bytes, expected {}", len, size),
            ));
        }

        // SAFETY: the file is sized to `size` above. Other processes may write
        // the same pages concurrently; callers only ever copy bytes in or out.
        let map = unsafe { MmapOptions::new().len(size).map_mut(&file) }
            .map_err(|e| BridgeError::transport_io(name, "mmap failed", e))?;

        Ok(Self { map })
    }

    pub(super) fn as_slice(&self) -> &[u8] {
        &self.map
    }

    pub(super) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.map
    }
}
