use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ParzError, Result};

/// Read-only, memory-mapped view over the whole input file. Shared by
/// reference with every worker of one operation.
pub struct InputSource {
    path: PathBuf,
    map: Mmap,
}

impl InputSource {
    /// Open `path`, rejecting missing and empty files before anything is mapped.
    pub fn open(path: &Path) -> Result<Self> {
        let md = match std::fs::metadata(path) {
            Ok(md) => md,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ParzError::InputNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        if !md.is_file() {
            return Err(ParzError::InputNotFound(path.to_path_buf()));
        }
        if md.len() == 0 {
            return Err(ParzError::EmptyInput(path.to_path_buf()));
        }
        let f = File::open(path)?;
        // SAFETY: the map is read-only and lives no longer than this operation;
        // concurrent truncation of the input by another process is not supported.
        let map = unsafe { Mmap::map(&f)? };
        Ok(Self { path: path.to_path_buf(), map })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes; never zero.
    pub fn size(&self) -> u64 {
        self.map.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.map
    }

    /// Borrow `[start, start + length)`, or `None` if it runs past the end.
    pub fn range(&self, start: u64, length: u64) -> Option<&[u8]> {
        let end = start.checked_add(length)?;
        if end > self.size() {
            return None;
        }
        Some(&self.map[start as usize..end as usize])
    }
}
