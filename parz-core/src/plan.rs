use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ParzError, Result};
use crate::footer::ContainerFooter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Compress,
    Decompress,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Compress => "compress",
            Operation::Decompress => "decompress",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ParzError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "compress" => Ok(Operation::Compress),
            "decompress" => Ok(Operation::Decompress),
            other => Err(ParzError::UnknownOperation(other.to_string())),
        }
    }
}

/// One unit of work: a contiguous byte range of the input.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub index: u32,
    pub start: u64,
    pub length: u64,
    pub mode: Operation,
}

impl ChunkDescriptor {
    pub fn end(&self) -> u64 {
        self.start + self.length
    }
}

/// Split `size` bytes into `workers` near-equal ranges (lengths differ by at
/// most one byte, the longer ones first). Inputs at or below `threshold` stay
/// whole.
pub fn plan_compression(size: u64, workers: usize, threshold: u64) -> Result<Vec<ChunkDescriptor>> {
    if size == 0 {
        return Err(ParzError::EmptyInput(PathBuf::new()));
    }
    let count = if size <= threshold { 1 } else { (workers.max(1) as u64).min(size) };
    let base = size / count;
    let mut rem = size % count;

    let mut out = Vec::with_capacity(count as usize);
    let mut start = 0u64;
    for index in 0..count {
        let mut length = base;
        if rem > 0 {
            length += 1;
            rem -= 1;
        }
        out.push(ChunkDescriptor { index: index as u32, start, length, mode: Operation::Compress });
        start += length;
    }
    debug_assert_eq!(start, size);
    Ok(out)
}

/// Bytes of input covered by `plan`. For a container this excludes the footer.
pub fn total_length(plan: &[ChunkDescriptor]) -> u64 {
    plan.iter().map(|d| d.length).sum()
}

/// Rebuild chunk ranges of a container from its decoded footer.
pub fn plan_decompression(footer: &ContainerFooter, container_len: u64) -> Result<Vec<ChunkDescriptor>> {
    let payload_end = footer.payload_end(container_len)?;
    footer.validate(payload_end)?;

    let offsets = footer.offsets();
    let mut out = Vec::with_capacity(offsets.len());
    for (i, &start) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(payload_end);
        out.push(ChunkDescriptor {
            index: i as u32,
            start,
            length: end - start,
            mode: Operation::Decompress,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_input_is_one_chunk() {
        let plan = plan_compression(1 << 20, 8, 1 << 20).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].length, 1 << 20);
    }

    #[test]
    fn remainder_goes_to_leading_chunks() {
        let plan = plan_compression(10, 4, 0).unwrap();
        let lens: Vec<u64> = plan.iter().map(|d| d.length).collect();
        assert_eq!(lens, vec![3, 3, 2, 2]);
        let starts: Vec<u64> = plan.iter().map(|d| d.start).collect();
        assert_eq!(starts, vec![0, 3, 6, 8]);
    }

    #[test]
    fn worker_count_never_exceeds_size() {
        let plan = plan_compression(3, 16, 0).unwrap();
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|d| d.length == 1));
    }

    #[test]
    fn zero_size_reports_unnamed_input() {
        let err = plan_compression(0, 4, 0).unwrap_err();
        assert_eq!(err.to_string(), "input is empty");
    }

    #[test]
    fn operation_parse() {
        assert_eq!("compress".parse::<Operation>().unwrap(), Operation::Compress);
        assert!(matches!("zip".parse::<Operation>(), Err(ParzError::UnknownOperation(s)) if s == "zip"));
    }
}
