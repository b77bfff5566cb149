use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Single-range compression primitive. Each call must produce (or consume)
/// one self-contained unit that decodes without any neighbouring chunk.
pub trait ChunkCodec: Send + Sync {
    fn name(&self) -> &'static str;
    /// Encode `src` into `dst`; returns compressed bytes written.
    fn encode(&self, src: &[u8], dst: &mut dyn Write) -> io::Result<u64>;
    /// Decode one unit from `src` into `dst`; returns decompressed bytes written.
    fn decode(&self, src: &[u8], dst: &mut dyn Write) -> io::Result<u64>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CodecKind {
    Zstd,
    Gzip,
    Store,
}

impl CodecKind {
    pub fn build(self, level: Option<i32>) -> Box<dyn ChunkCodec> {
        match self {
            CodecKind::Zstd => Box::new(ZstdCodec::new(level.unwrap_or(zstd::DEFAULT_COMPRESSION_LEVEL))),
            CodecKind::Gzip => Box::new(GzipCodec::new(level.unwrap_or(6).clamp(0, 9) as u32)),
            CodecKind::Store => Box::new(StoreCodec),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CodecKind::Zstd => "zstd",
            CodecKind::Gzip => "gzip",
            CodecKind::Store => "store",
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodecKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zstd" => Ok(CodecKind::Zstd),
            "gzip" | "gz" => Ok(CodecKind::Gzip),
            "store" | "none" => Ok(CodecKind::Store),
            other => Err(format!("unknown codec {other:?}")),
        }
    }
}

/// Counts bytes passing through to the wrapped writer.
struct Counted<'a> {
    inner: &'a mut dyn Write,
    written: u64,
}

impl Write for Counted<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl ChunkCodec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn encode(&self, src: &[u8], dst: &mut dyn Write) -> io::Result<u64> {
        let mut out = Counted { inner: dst, written: 0 };
        zstd::stream::copy_encode(src, &mut out, self.level)?;
        Ok(out.written)
    }

    fn decode(&self, src: &[u8], dst: &mut dyn Write) -> io::Result<u64> {
        let mut out = Counted { inner: dst, written: 0 };
        zstd::stream::copy_decode(src, &mut out)?;
        Ok(out.written)
    }
}

/// One gzip member per chunk.
pub struct GzipCodec {
    level: u32,
}

impl GzipCodec {
    pub fn new(level: u32) -> Self {
        Self { level }
    }
}

impl ChunkCodec for GzipCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn encode(&self, src: &[u8], dst: &mut dyn Write) -> io::Result<u64> {
        let mut out = Counted { inner: dst, written: 0 };
        let mut enc = flate2::write::GzEncoder::new(&mut out, flate2::Compression::new(self.level));
        enc.write_all(src)?;
        enc.finish()?;
        Ok(out.written)
    }

    /// The range must hold exactly one member; trailing bytes are an error.
    fn decode(&self, src: &[u8], dst: &mut dyn Write) -> io::Result<u64> {
        // bufread over the slice itself, so whatever the member did not use stays visible
        let mut dec = flate2::bufread::GzDecoder::new(src);
        let n = io::copy(&mut dec, dst)?;
        let rest = dec.into_inner();
        if !rest.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} unexpected bytes after gzip member", rest.len()),
            ));
        }
        Ok(n)
    }
}

pub struct StoreCodec;

impl ChunkCodec for StoreCodec {
    fn name(&self) -> &'static str {
        "store"
    }

    fn encode(&self, src: &[u8], dst: &mut dyn Write) -> io::Result<u64> {
        dst.write_all(src)?;
        Ok(src.len() as u64)
    }

    fn decode(&self, src: &[u8], dst: &mut dyn Write) -> io::Result<u64> {
        dst.write_all(src)?;
        Ok(src.len() as u64)
    }
}
