//! Payload compression and decompression handling.

use std::fmt::Debug;
use std::io::{Read, Write};

use binrw::{BinRead, BinWrite};
use flate2::{read::DeflateDecoder, write::DeflateEncoder, Compression};
use tracing::{instrument, trace};

use crate::error::{Error, Result};

/// Identifies the storage format of an entry payload inside the MRS file
#[derive(BinRead, BinWrite, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[brw(repr=u16)]
pub enum CompressionMethod {
    /// Stores the data as it is
    Store = 0,

    /// Compress the data using raw deflate (no zlib framing)
    #[default]
    Deflate = 8,
}

const CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

/// CRC32 of an uncompressed payload, as stored in entry headers
pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Something able to pack entry payloads
///
/// Compressed output is always recorded as [`CompressionMethod::Deflate`], so replacements must
/// produce and accept raw deflate streams.
pub trait CompressionProvider: Debug + Send + Sync {
    /// Compress `data`, or `None` to store it as is
    fn compress(&self, data: &[u8]) -> Option<Vec<u8>>;

    /// Inflate `data` which must expand to exactly `expected_len` bytes
    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>>;
}

/// Raw deflate through [`flate2`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Deflate {
    level: u32,
}

impl Deflate {
    /// Compression level of archives shipped with the game
    pub const DEFAULT_LEVEL: u32 = 9;

    /// Levels above 9 are clamped
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for Deflate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEVEL)
    }
}

impl CompressionProvider for Deflate {
    #[instrument(skip(data), fields(size = data.len()))]
    fn compress(&self, data: &[u8]) -> Option<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len()), Compression::new(self.level));
        let compressed = encoder.write_all(data).and_then(|_| encoder.finish()).ok()?;

        if compressed.len() >= data.len() {
            trace!(compressed = compressed.len(), "storing, deflate did not shrink payload");
            return None;
        }

        Some(compressed)
    }

    #[instrument(skip(data), fields(size = data.len()), err)]
    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(expected_len);
        DeflateDecoder::new(data)
            .take(expected_len as u64 + 1)
            .read_to_end(&mut out)
            .map_err(|_| Error::CannotDecompress)?;

        if out.len() != expected_len {
            return Err(Error::CannotDecompress);
        }

        Ok(out)
    }
}
