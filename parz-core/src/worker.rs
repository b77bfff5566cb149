use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

use crate::codec::ChunkCodec;
use crate::error::ChunkError;
use crate::plan::{ChunkDescriptor, Operation};
use crate::scratch::{ChunkPayload, ChunkSink, ScratchPolicy};
use crate::source::InputSource;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Outcome of one chunk. Holds the only handle to the chunk's storage.
#[derive(Debug)]
pub struct ChunkResult {
    pub index: u32,
    pub state: ChunkState,
    pub payload: Option<ChunkPayload>,
    pub error: Option<ChunkError>,
}

impl ChunkResult {
    pub fn into_payload(self) -> Result<ChunkPayload, ChunkError> {
        match (self.payload, self.error) {
            (Some(p), None) => Ok(p),
            (_, Some(e)) => Err(e),
            (None, None) => Err(ChunkError::Panicked(format!("chunk {} produced no payload", self.index))),
        }
    }
}

/// Runs exactly one descriptor against the shared input.
pub struct ChunkWorker {
    desc: ChunkDescriptor,
    state: ChunkState,
}

impl ChunkWorker {
    pub fn new(desc: ChunkDescriptor) -> Self {
        Self { desc, state: ChunkState::Pending }
    }

    /// Process the chunk to a terminal state. Errors and codec panics are
    /// captured in the result; any partial scratch file is dropped here.
    pub fn run(mut self, input: &InputSource, codec: &dyn ChunkCodec, scratch: &ScratchPolicy) -> ChunkResult {
        self.state = ChunkState::Running;
        let index = self.desc.index;
        debug!(chunk = index, start = self.desc.start, len = self.desc.length, mode = %self.desc.mode, "chunk running");

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.process(input, codec, scratch))) {
            Ok(r) => r,
            Err(p) => Err(ChunkError::Panicked(panic_message(p))),
        };

        match outcome {
            Ok(payload) => {
                self.state = ChunkState::Completed;
                debug!(chunk = index, out = payload.len(), spilled = payload.is_spilled(), "chunk completed");
                ChunkResult { index, state: self.state, payload: Some(payload), error: None }
            }
            Err(e) => {
                self.state = ChunkState::Failed;
                debug!(chunk = index, error = %e, "chunk failed");
                ChunkResult { index, state: self.state, payload: None, error: Some(e) }
            }
        }
    }

    fn process(&self, input: &InputSource, codec: &dyn ChunkCodec, scratch: &ScratchPolicy) -> Result<ChunkPayload, ChunkError> {
        let d = &self.desc;
        let src = input.range(d.start, d.length).ok_or(ChunkError::OutOfRange {
            start: d.start,
            length: d.length,
            size: input.size(),
        })?;

        let mut sink = ChunkSink::new(scratch);
        let res = match d.mode {
            Operation::Compress => codec.encode(src, &mut sink),
            Operation::Decompress => codec.decode(src, &mut sink),
        };
        if let Err(source) = res {
            if sink.scratch_failed() {
                return Err(ChunkError::Scratch(source));
            }
            return Err(ChunkError::Codec { codec: codec.name(), source });
        }
        sink.finish().map_err(ChunkError::Scratch)
    }
}

fn panic_message(p: Box<dyn Any + Send>) -> String {
    if let Some(s) = p.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = p.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
