//! Bounded parallel execution of planned chunks with in-order assembly.
//!
//! Every chunk gets its own scoped thread, admitted through a counting
//! semaphore sized to the worker count. Results travel back over one channel
//! per chunk, and the caller drains those channels strictly by index, so the
//! output order never depends on which worker finishes first.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, info, warn};

use crate::codec::ChunkCodec;
use crate::config::Config;
use crate::error::{ChunkError, ParzError, Result};
use crate::footer::ContainerFooter;
use crate::plan::{plan_compression, plan_decompression, total_length, ChunkDescriptor, Operation};
use crate::progress::Progress;
use crate::scratch::{ChunkPayload, ScratchPolicy};
use crate::semaphore::Semaphore;
use crate::source::InputSource;
use crate::worker::{ChunkResult, ChunkState, ChunkWorker};

/// Summary of a finished operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub operation: Operation,
    pub chunks: usize,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

pub fn compress_file(input: &Path, output: &Path, cfg: &Config) -> Result<Report> {
    run(Operation::Compress, input, output, cfg)
}

pub fn decompress_file(input: &Path, output: &Path, cfg: &Config) -> Result<Report> {
    run(Operation::Decompress, input, output, cfg)
}

/// Run `op` with the codec named in `cfg`.
pub fn run(op: Operation, input: &Path, output: &Path, cfg: &Config) -> Result<Report> {
    let codec = cfg.codec.build(cfg.level);
    run_with_codec(op, input, output, cfg, codec.as_ref())
}

/// Run `op` with a caller-supplied codec.
pub fn run_with_codec(
    op: Operation,
    input: &Path,
    output: &Path,
    cfg: &Config,
    codec: &dyn ChunkCodec,
) -> Result<Report> {
    let workers = cfg.resolved_workers();
    let source = InputSource::open(input)?;
    let plan = match op {
        Operation::Compress => plan_compression(source.size(), workers, cfg.small_file_threshold)?,
        Operation::Decompress => {
            let footer = ContainerFooter::decode(source.bytes())?;
            plan_decompression(&footer, source.size())?
        }
    };
    info!(
        operation = %op,
        input = %source.path().display(),
        size = source.size(),
        chunks = plan.len(),
        workers,
        codec = codec.name(),
        "chunks planned"
    );

    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut out = BufWriter::new(output_file(parent)?);

    let scratch = ScratchPolicy::new(cfg.memory_limit, cfg.scratch_dir.clone(), workers);
    let progress = Progress::new(cfg.progress);
    progress.set_stage(op.as_str());
    progress.set_chunks_total(plan.len());
    progress.reset_bytes(total_length(&plan));
    progress.start();

    let mut footer = ContainerFooter::with_capacity(plan.len());
    let mut written = 0u64;
    let drained = execute(&plan, &source, codec, &scratch, workers, |desc, payload| {
        if op == Operation::Compress {
            if payload.is_empty() {
                let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "codec produced no output");
                return Err(ParzError::from_chunk(desc.index, ChunkError::Codec { codec: codec.name(), source }));
            }
            footer.push(written);
        }
        let n = payload.copy_to(&mut out)?;
        debug!(chunk = desc.index, offset = written, bytes = n, "chunk written");
        written += n;
        progress.inc_chunk();
        progress.add_bytes(desc.length);
        Ok(())
    });
    progress.stop();
    drained?;

    if op == Operation::Compress {
        written += footer.write_to(&mut out)?;
    }
    let tmp = out.into_inner().map_err(|e| e.into_error())?;
    tmp.as_file().sync_all()?;
    tmp.persist(output).map_err(|e| ParzError::Io(e.error))?;

    info!(operation = %op, output = %output.display(), bytes = written, "done");
    Ok(Report { operation: op, chunks: plan.len(), bytes_in: source.size(), bytes_out: written })
}

/// Temp file that becomes the output on success. It is created with the mode
/// a plain `File::create` would get, so the persisted file is not owner-only.
fn output_file(dir: &Path) -> std::io::Result<tempfile::NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".parz-out-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}

/// Run every descriptor with at most `workers` live at once and feed the
/// payloads to `drain` in ascending index order. The first failed chunk (or
/// drain error) stops further submission; results not yet drained are
/// dropped, which deletes their scratch files before this returns.
pub fn execute<F>(
    plan: &[ChunkDescriptor],
    input: &InputSource,
    codec: &dyn ChunkCodec,
    scratch: &ScratchPolicy,
    workers: usize,
    mut drain: F,
) -> Result<()>
where
    F: FnMut(&ChunkDescriptor, ChunkPayload) -> Result<()>,
{
    let slots = Semaphore::new(workers.max(1));
    let abort = AtomicBool::new(false);
    let (senders, receivers): (Vec<_>, Vec<_>) =
        plan.iter().map(|_| mpsc::sync_channel::<ChunkResult>(1)).unzip();

    thread::scope(|s| {
        let (slots, abort) = (&slots, &abort);
        s.spawn(move || {
            for (desc, tx) in plan.iter().zip(senders) {
                let permit = slots.acquire();
                if abort.load(Ordering::Acquire) {
                    debug!(chunk = desc.index, "submission stopped");
                    break;
                }
                let worker = ChunkWorker::new(*desc);
                s.spawn(move || {
                    let _permit = permit;
                    let result = worker.run(input, codec, scratch);
                    // A closed channel means the drain gave up; dropping the result frees it.
                    let _ = tx.send(result);
                });
            }
        });

        let outcome = drain_in_order(plan, receivers, &mut drain);
        if outcome.is_err() {
            abort.store(true, Ordering::Release);
        }
        outcome
    })
}

fn drain_in_order<F>(plan: &[ChunkDescriptor], receivers: Vec<mpsc::Receiver<ChunkResult>>, drain: &mut F) -> Result<()>
where
    F: FnMut(&ChunkDescriptor, ChunkPayload) -> Result<()>,
{
    for (desc, rx) in plan.iter().zip(receivers) {
        let result = rx.recv().map_err(|_| {
            ParzError::from_chunk(desc.index, ChunkError::Panicked("worker exited without a result".into()))
        })?;
        debug_assert_eq!(result.index, desc.index);
        match result.state {
            ChunkState::Completed => {
                let payload = result.into_payload().map_err(|e| ParzError::from_chunk(desc.index, e))?;
                drain(desc, payload)?;
            }
            _ => {
                let err = result
                    .into_payload()
                    .err()
                    .unwrap_or_else(|| ChunkError::Panicked("chunk did not complete".into()));
                warn!(chunk = desc.index, error = %err, "chunk failed, aborting");
                return Err(ParzError::from_chunk(desc.index, err));
            }
        }
    }
    Ok(())
}
