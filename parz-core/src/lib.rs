pub mod codec;
pub mod config;
pub mod error;
pub mod footer;
pub mod inspect;
pub mod orchestrator;
pub mod plan;
pub mod progress;
pub mod scratch;
pub mod semaphore;
pub mod source;
pub mod worker;

pub use codec::{ChunkCodec, CodecKind};
pub use config::Config;
pub use error::{ChunkError, ParzError, Result};
pub use inspect::{inspect, ContainerSummary};
pub use orchestrator::{compress_file, decompress_file, run, run_with_codec, Report};
pub use plan::{ChunkDescriptor, Operation};
