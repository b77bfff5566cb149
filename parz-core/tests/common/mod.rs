#![allow(dead_code)]

use parz_core::ChunkCodec;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Writes `chunks` runs of `chunk_len` bytes, run `i` filled with byte `i`,
/// so a codec can tell which chunk it was handed from the first byte.
pub fn write_tagged(path: &Path, chunks: usize, chunk_len: usize) -> Vec<u8> {
    let data: Vec<u8> = (0..chunks).flat_map(|i| std::iter::repeat(i as u8).take(chunk_len)).collect();
    std::fs::write(path, &data).unwrap();
    data
}

pub fn dir_entries(path: &Path) -> Vec<String> {
    let mut v: Vec<String> = std::fs::read_dir(path)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    v.sort();
    v
}

/// Identity codec that sleeps per tag, optionally fails one tag, and
/// records completion order plus call and concurrency counts.
#[derive(Default)]
pub struct ScriptedCodec {
    pub delays_ms: Vec<u64>,
    pub fail_tag: Option<u8>,
    pub hold_ms: u64,
    pub finished: Mutex<Vec<u8>>,
    pub calls: AtomicUsize,
    pub live: AtomicUsize,
    pub peak: AtomicUsize,
}

impl ScriptedCodec {
    fn pass(&self, src: &[u8], dst: &mut dyn Write) -> io::Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let tag = src.first().copied().unwrap_or(0);
        let delay = self.delays_ms.get(tag as usize).copied().unwrap_or(0) + self.hold_ms;
        std::thread::sleep(Duration::from_millis(delay));

        let res = if self.fail_tag == Some(tag) {
            Err(io::Error::new(io::ErrorKind::Other, format!("scripted failure for tag {tag}")))
        } else {
            dst.write_all(src).map(|_| src.len() as u64)
        };
        self.finished.lock().unwrap().push(tag);
        self.live.fetch_sub(1, Ordering::SeqCst);
        res
    }

    pub fn finish_order(&self) -> Vec<u8> {
        self.finished.lock().unwrap().clone()
    }
}

impl ChunkCodec for ScriptedCodec {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn encode(&self, src: &[u8], dst: &mut dyn Write) -> io::Result<u64> {
        self.pass(src, dst)
    }

    fn decode(&self, src: &[u8], dst: &mut dyn Write) -> io::Result<u64> {
        self.pass(src, dst)
    }
}
