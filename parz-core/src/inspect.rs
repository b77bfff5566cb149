use serde::Serialize;
use std::path::Path;

use crate::error::Result;
use crate::footer::ContainerFooter;
use crate::plan::plan_decompression;
use crate::source::InputSource;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ChunkSpan {
    pub index: u32,
    pub offset: u64,
    pub length: u64,
}

/// Layout of a container as recorded by its footer.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ContainerSummary {
    pub container_bytes: u64,
    pub payload_bytes: u64,
    pub footer_bytes: u64,
    pub chunks: Vec<ChunkSpan>,
}

/// Read and validate the footer of `path` without decoding any chunk.
pub fn inspect(path: &Path) -> Result<ContainerSummary> {
    let source = InputSource::open(path)?;
    let footer = ContainerFooter::decode(source.bytes())?;
    let plan = plan_decompression(&footer, source.size())?;
    let chunks = plan.iter().map(|d| ChunkSpan { index: d.index, offset: d.start, length: d.length }).collect();
    Ok(ContainerSummary {
        container_bytes: source.size(),
        payload_bytes: footer.payload_end(source.size())?,
        footer_bytes: footer.encoded_len(),
        chunks,
    })
}
