//! Base types for structure of MRS file.
//!
//! All records are little endian and packed. Signatures are kept as plain values
//! rather than binrw magic because which values are accepted is configurable,
//! see [`crate::crypto::Signatures`].

use std::io::Cursor;

use binrw::{BinRead, BinWrite};

use crate::compression::CompressionMethod;
use crate::dostime::DosDateTime;
use crate::error::Result;

/// MRS trailer header
///
/// Stored as the very last bytes of the archive and summarizes where the central directory lives.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct BaseHeader {
    /// Identifies the file as an MRS archive
    pub signature: u32,

    /// Number of this disk, always zero
    pub disk_number: u16,

    /// Disk where the central directory starts, always zero
    pub disk_start: u16,

    /// Number of central directory records on this disk
    pub entry_count: u16,

    /// Total number of central directory records
    pub total_entry_count: u16,

    /// Size in bytes of the central directory block
    pub directory_size: u32,

    /// Offset from the start of the file to the central directory block
    pub directory_offset: u32,

    /// Length of the archive comment, always zero
    pub comment_length: u16,
}

impl BaseHeader {
    pub const SIZE: usize = 22;

    /// Signature written for new archives
    pub const SIGNATURE: u32 = 0x0503_0208;

    /// Signatures accepted by default when reading
    pub const KNOWN_SIGNATURES: [u32; 3] = [0x0503_0207, 0x0503_0208, 0x0605_4b50];
}

/// MRS local entry header
///
/// Precedes the entry name, the local extra field and the payload of every entry.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct LocalHeader {
    /// Identifies a local entry header
    pub signature: u32,

    /// Version needed to extract
    pub version: u16,

    /// General purpose flags
    pub flags: u16,

    /// The compression used for the payload
    pub compression: CompressionMethod,

    /// Last modification time
    pub modified: DosDateTime,

    /// CRC32 of the uncompressed payload
    pub crc32: u32,

    /// Size of the payload as stored
    pub compressed_size: u32,

    /// Size of the payload after decompression
    pub uncompressed_size: u32,

    /// Length of the name that follows
    pub filename_length: u16,

    /// Length of the extra field that follows the name
    pub extra_length: u16,
}

impl LocalHeader {
    pub const SIZE: usize = 30;

    /// Signature written for new entries
    pub const SIGNATURE: u32 = 0x0403_4b50;

    /// Signatures accepted by default when reading
    pub const KNOWN_SIGNATURES: [u32; 2] = [0x0403_4b50, 0x8584_0000];

    /// Version written for new entries
    pub const VERSION: u16 = 0x14;
}

/// MRS central directory entry header
///
/// The authoritative record for an entry. All of them are stored back to back, each followed by its
/// name, extra field and comment.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct CentralDirHeader {
    /// Identifies a central directory header
    pub signature: u32,

    /// Version of the tool that made the entry
    pub version_made: u16,

    /// Version needed to extract
    pub version_needed: u16,

    /// General purpose flags
    pub flags: u16,

    /// The compression used for the payload
    pub compression: CompressionMethod,

    /// Last modification time
    pub modified: DosDateTime,

    /// CRC32 of the uncompressed payload
    pub crc32: u32,

    /// Size of the payload as stored
    pub compressed_size: u32,

    /// Size of the payload after decompression
    pub uncompressed_size: u32,

    /// Length of the name that follows
    pub filename_length: u16,

    /// Length of the extra field that follows the name
    pub extra_length: u16,

    /// Length of the comment that follows the extra field
    pub comment_length: u16,

    /// Disk where the entry starts, always zero
    pub disk_start: u16,

    /// Internal file attributes
    pub internal_attributes: u16,

    /// External file attributes
    pub external_attributes: u32,

    /// Offset from the start of the file to the local header
    pub offset: u32,
}

impl CentralDirHeader {
    pub const SIZE: usize = 46;

    /// Signature written for new entries
    pub const SIGNATURE: u32 = 0x0201_4b50;

    /// Signatures accepted by default when reading
    pub const KNOWN_SIGNATURES: [u32; 2] = [0x0201_4b50, 0x0502_4b80];

    /// Version written as "made by" for new entries
    pub const VERSION_MADE: u16 = 0x19;

    /// Version written as "needed to extract" for new entries
    pub const VERSION_NEEDED: u16 = 0x14;
}

macro_rules! fixed_record {
    ($($record:ty),*) => {
        $(
            impl $record {
                /// Serializes the record into exactly [`Self::SIZE`] bytes
                pub fn to_bytes(&self) -> Result<Vec<u8>> {
                    let mut out = Cursor::new(Vec::with_capacity(Self::SIZE));
                    self.write(&mut out)?;
                    Ok(out.into_inner())
                }

                /// Parses the record from the start of `bytes`
                pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
                    Ok(Self::read(&mut Cursor::new(bytes))?)
                }
            }
        )*
    };
}

fixed_record!(BaseHeader, LocalHeader, CentralDirHeader);
