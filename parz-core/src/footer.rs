use std::io::{self, Write};

use crate::error::{ParzError, Result};

/// Trailer layout at EOF: `offsets` (u64 LE each) then `count` (u32 LE).
pub const COUNT_LEN: u64 = 4;
pub const OFFSET_LEN: u64 = 8;

/// Chunk index appended to every compressed container. `offsets[i]` is where
/// chunk `i`'s payload begins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerFooter {
    offsets: Vec<u64>,
}

impl ContainerFooter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self { offsets: Vec::with_capacity(n) }
    }

    /// Record the start of the next chunk. Offsets only grow.
    pub fn push(&mut self, offset: u64) {
        debug_assert!(self.offsets.last().map_or(true, |&last| offset > last));
        self.offsets.push(offset);
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    pub fn count(&self) -> u32 {
        self.offsets.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Size in bytes of the encoded trailer.
    pub fn encoded_len(&self) -> u64 {
        footer_len(self.count())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len() as usize);
        for off in &self.offsets {
            buf.extend_from_slice(&off.to_le_bytes());
        }
        buf.extend_from_slice(&self.count().to_le_bytes());
        buf
    }

    pub fn write_to(&self, w: &mut dyn Write) -> io::Result<u64> {
        let buf = self.encode();
        w.write_all(&buf)?;
        Ok(buf.len() as u64)
    }

    /// Decode and validate the trailer of a whole container image.
    pub fn decode(container: &[u8]) -> Result<Self> {
        let flen = container.len() as u64;
        if flen < COUNT_LEN {
            return Err(corrupt(format!("{flen} bytes is too short for a footer")));
        }
        let mut count4 = [0u8; 4];
        count4.copy_from_slice(&container[(flen - COUNT_LEN) as usize..]);
        let count = u32::from_le_bytes(count4);
        if count == 0 {
            return Err(corrupt("chunk count is zero".into()));
        }
        let trailer = footer_len(count);
        if trailer > flen {
            return Err(corrupt(format!(
                "footer claims {count} chunks ({trailer} bytes) but the file is {flen} bytes"
            )));
        }

        let base = (flen - trailer) as usize;
        let offsets = container[base..(flen - COUNT_LEN) as usize]
            .chunks_exact(OFFSET_LEN as usize)
            .map(|c| {
                let mut off8 = [0u8; 8];
                off8.copy_from_slice(c);
                u64::from_le_bytes(off8)
            })
            .collect();
        let footer = Self { offsets };
        footer.validate(flen - trailer)?;
        Ok(footer)
    }

    /// First byte past the last chunk payload in a container of `container_len` bytes.
    pub fn payload_end(&self, container_len: u64) -> Result<u64> {
        container_len.checked_sub(self.encoded_len()).ok_or_else(|| {
            corrupt(format!("footer of {} bytes exceeds the {container_len}-byte file", self.encoded_len()))
        })
    }

    /// Offsets must start at 0, strictly increase, and leave a non-empty last chunk.
    pub fn validate(&self, payload_end: u64) -> Result<()> {
        if self.is_empty() {
            return Err(corrupt("chunk count is zero".into()));
        }
        let first = self.offsets[0];
        if first != 0 {
            return Err(corrupt(format!("first chunk starts at {first}, expected 0")));
        }
        for (i, pair) in self.offsets.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(corrupt(format!(
                    "offset of chunk {} ({}) does not follow chunk {} ({})",
                    i + 1,
                    pair[1],
                    i,
                    pair[0]
                )));
            }
        }
        let last = self.offsets[self.offsets.len() - 1];
        if last >= payload_end {
            return Err(corrupt(format!("last chunk starts at {last}, past payload end {payload_end}")));
        }
        Ok(())
    }
}

fn footer_len(count: u32) -> u64 {
    COUNT_LEN + count as u64 * OFFSET_LEN
}

fn corrupt(msg: String) -> ParzError {
    ParzError::CorruptContainer(msg)
}
