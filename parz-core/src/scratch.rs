use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;

const SCRATCH_PREFIX: &str = ".parz-chunk-";

/// Where and when chunk results spill to disk.
///
/// `memory_limit` caps a single chunk result. Results held in memory at the
/// same time, drained or not, share a budget of `memory_limit * slots`; a
/// result that would overrun it goes to scratch instead.
#[derive(Clone, Debug)]
pub struct ScratchPolicy {
    pub memory_limit: usize,
    pub dir: Option<PathBuf>,
    held: Arc<AtomicUsize>,
    held_limit: usize,
}

impl ScratchPolicy {
    pub fn new(memory_limit: usize, dir: Option<PathBuf>, slots: usize) -> Self {
        Self {
            memory_limit,
            dir,
            held: Arc::new(AtomicUsize::new(0)),
            held_limit: memory_limit.saturating_mul(slots.max(1)),
        }
    }

    /// Bytes of chunk results currently kept in memory.
    pub fn held_bytes(&self) -> usize {
        self.held.load(Ordering::Acquire)
    }

    fn lease(&self) -> MemoryLease {
        MemoryLease { held: Arc::clone(&self.held), bytes: 0 }
    }

    fn try_hold(&self, lease: &mut MemoryLease, n: usize) -> bool {
        let limit = self.held_limit;
        let ok = self
            .held
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| cur.checked_add(n).filter(|&t| t <= limit))
            .is_ok();
        if ok {
            lease.bytes += n;
        }
        ok
    }

    fn create(&self) -> io::Result<NamedTempFile> {
        let mut b = tempfile::Builder::new();
        b.prefix(SCRATCH_PREFIX);
        match &self.dir {
            Some(dir) => b.tempfile_in(dir),
            None => b.tempfile(),
        }
    }
}

/// Share of the in-memory budget taken by one result; returned on drop.
#[derive(Debug)]
pub struct MemoryLease {
    held: Arc<AtomicUsize>,
    bytes: usize,
}

impl MemoryLease {
    fn release(&mut self) {
        self.held.fetch_sub(self.bytes, Ordering::AcqRel);
        self.bytes = 0;
    }
}

impl Drop for MemoryLease {
    fn drop(&mut self) {
        self.release();
    }
}

/// Finished chunk bytes. A scratch file is removed and a memory lease is
/// returned when the payload drops.
#[derive(Debug)]
pub enum ChunkPayload {
    Memory { data: Vec<u8>, lease: MemoryLease },
    Scratch { file: NamedTempFile, len: u64 },
}

impl ChunkPayload {
    pub fn len(&self) -> u64 {
        match self {
            ChunkPayload::Memory { data, .. } => data.len() as u64,
            ChunkPayload::Scratch { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_spilled(&self) -> bool {
        matches!(self, ChunkPayload::Scratch { .. })
    }

    pub fn scratch_path(&self) -> Option<&Path> {
        match self {
            ChunkPayload::Memory { .. } => None,
            ChunkPayload::Scratch { file, .. } => Some(file.path()),
        }
    }

    /// Copy the whole payload into `w`, consuming it.
    pub fn copy_to(self, w: &mut dyn Write) -> io::Result<u64> {
        match self {
            ChunkPayload::Memory { data, .. } => {
                w.write_all(&data)?;
                Ok(data.len() as u64)
            }
            ChunkPayload::Scratch { mut file, len } => {
                let copied = io::copy(&mut file.as_file_mut().take(len), w)?;
                if copied != len {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("scratch file held {copied} of {len} bytes"),
                    ));
                }
                Ok(copied)
            }
        }
    }
}

enum Backing {
    Memory(Vec<u8>, MemoryLease),
    Scratch(NamedTempFile),
}

/// Result writer for one chunk: grows in memory while both the per-chunk limit
/// and the shared budget allow, then moves everything to a scratch file and
/// keeps appending there.
pub struct ChunkSink<'a> {
    policy: &'a ScratchPolicy,
    backing: Backing,
    len: u64,
    scratch_error: Option<io::ErrorKind>,
}

impl<'a> ChunkSink<'a> {
    pub fn new(policy: &'a ScratchPolicy) -> Self {
        Self { policy, backing: Backing::Memory(Vec::new(), policy.lease()), len: 0, scratch_error: None }
    }

    /// Set when a scratch file could not be created or written.
    pub fn scratch_failed(&self) -> bool {
        self.scratch_error.is_some()
    }

    fn spill(&mut self) -> io::Result<()> {
        let Backing::Memory(buf, lease) = &mut self.backing else {
            return Ok(());
        };
        let mut file = self.policy.create()?;
        file.write_all(buf)?;
        lease.release();
        self.backing = Backing::Scratch(file);
        Ok(())
    }

    /// Rewind and hand over the bytes written so far.
    pub fn finish(self) -> io::Result<ChunkPayload> {
        match self.backing {
            Backing::Memory(data, lease) => Ok(ChunkPayload::Memory { data, lease }),
            Backing::Scratch(mut file) => {
                file.flush()?;
                file.seek(SeekFrom::Start(0))?;
                Ok(ChunkPayload::Scratch { file, len: self.len })
            }
        }
    }
}

impl Write for ChunkSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let over = match &mut self.backing {
            Backing::Memory(v, lease) => {
                v.len() + buf.len() > self.policy.memory_limit || !self.policy.try_hold(lease, buf.len())
            }
            Backing::Scratch(_) => false,
        };
        if over {
            if let Err(e) = self.spill() {
                self.scratch_error = Some(e.kind());
                return Err(e);
            }
        }
        let n = match &mut self.backing {
            Backing::Memory(v, _) => {
                v.extend_from_slice(buf);
                buf.len()
            }
            Backing::Scratch(file) => match file.write(buf) {
                Ok(n) => n,
                Err(e) => {
                    self.scratch_error = Some(e.kind());
                    return Err(e);
                }
            },
        };
        self.len += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.backing {
            Backing::Memory(..) => Ok(()),
            Backing::Scratch(file) => file.flush(),
        }
    }
}
