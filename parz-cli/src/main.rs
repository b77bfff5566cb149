use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use parz_core::config::{DEFAULT_MEMORY_LIMIT, DEFAULT_SMALL_FILE_THRESHOLD};
use parz_core::{CodecKind, Config, Operation};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CodecArg { Zstd, Gzip, Store }

impl From<CodecArg> for CodecKind {
    fn from(c: CodecArg) -> Self {
        match c {
            CodecArg::Zstd => CodecKind::Zstd,
            CodecArg::Gzip => CodecKind::Gzip,
            CodecArg::Store => CodecKind::Store,
        }
    }
}

#[derive(Parser)]
#[command(name = "parz", version, about = "Parallel chunked file compressor")]
struct Cli {
    /// compress | decompress | inspect
    operation: String,
    input: PathBuf,
    /// Required for compress and decompress
    output: Option<PathBuf>,
    /// Concurrent chunk workers (default: logical CPUs)
    #[arg(long)] workers: Option<usize>,
    /// Must match between compress and decompress
    #[arg(long, value_enum, default_value_t = CodecArg::Zstd)] codec: CodecArg,
    #[arg(long)] level: Option<i32>,
    /// Inputs up to this many bytes are compressed as one chunk
    #[arg(long, default_value_t = DEFAULT_SMALL_FILE_THRESHOLD)] small_file_threshold: u64,
    /// Per-chunk result bytes kept in memory before spilling to a scratch file
    #[arg(long, default_value_t = DEFAULT_MEMORY_LIMIT)] memory_limit: usize,
    #[arg(long)] scratch_dir: Option<PathBuf>,
    #[arg(long, default_value_t = false)] progress: bool,
    /// inspect: print the chunk table as JSON
    #[arg(long, default_value_t = false)] json: bool,
}

enum Command { Run(Operation), Inspect }

fn parse_command(s: &str) -> Result<Command> {
    if s == "inspect" { return Ok(Command::Inspect); }
    Ok(Command::Run(s.parse::<Operation>()?))
}

fn main() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        if !e.use_stderr() { e.exit() }
        let _ = e.print();
        std::process::exit(1)
    });
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match parse_command(&cli.operation)? {
        Command::Run(op) => {
            let output = cli.output.as_deref().ok_or_else(|| anyhow!("{} needs an output path", op))?;
            let cfg = Config {
                workers: cli.workers.unwrap_or(0),
                codec: cli.codec.into(),
                level: cli.level,
                small_file_threshold: cli.small_file_threshold,
                memory_limit: cli.memory_limit,
                scratch_dir: cli.scratch_dir.clone(),
                progress: cli.progress,
            };
            run(op, &cli.input, output, &cfg)?;
        }
        Command::Inspect => inspect(&cli.input, cli.json)?,
    }
    Ok(())
}

fn run(op: Operation, input: &Path, output: &Path, cfg: &Config) -> Result<()> {
    let report = parz_core::run(op, input, output, cfg)
        .with_context(|| format!("{} {} -> {}", op, input.display(), output.display()))?;
    if cfg.progress {
        eprintln!("{}: {} chunk(s), {} -> {} bytes", op, report.chunks, report.bytes_in, report.bytes_out);
    }
    Ok(())
}

fn inspect(container: &Path, json: bool) -> Result<()> {
    let summary = parz_core::inspect(container).with_context(|| format!("inspect {}", container.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("{}: {} chunk(s), payload {} bytes, footer {} bytes",
        container.display(), summary.chunks.len(), summary.payload_bytes, summary.footer_bytes);
    for c in &summary.chunks {
        println!("  chunk {:>4}  offset {:>14}  length {:>12}", c.index, c.offset, c.length);
    }
    Ok(())
}
