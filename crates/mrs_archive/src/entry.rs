//! The canonical in-memory record of an archived entry.
//!
//! The local and central directory headers of an entry are never stored; both are computed from
//! [`Entry`] when saving, so the fields they share cannot disagree.

use std::time::SystemTime;

use crate::buffers::{BufferHandle, SharedBufferTable};
use crate::compression::CompressionMethod;
use crate::dostime::DosDateTime;
use crate::error::{Error, Result};
use crate::path;
use crate::types::{CentralDirHeader, LocalHeader};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Entry {
    /// `/` separated
    pub name: String,
    /// Name bytes as read, kept when they are not UTF-8 and until the entry is renamed
    pub raw_name: Option<Vec<u8>>,
    pub local_signature: u32,
    pub central_signature: u32,
    pub local_version: u16,
    pub version_made: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression: CompressionMethod,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub disk_start: u16,
    pub internal_attributes: u16,
    pub external_attributes: u32,
    /// Offset of the payload in the scratch store
    pub offset: u64,
    pub local_extra: Option<BufferHandle>,
    pub extra: Option<BufferHandle>,
    pub comment: Option<BufferHandle>,
}

impl Entry {
    pub fn new(name: String, modified: DosDateTime) -> Self {
        Self {
            name,
            raw_name: None,
            local_signature: LocalHeader::SIGNATURE,
            central_signature: CentralDirHeader::SIGNATURE,
            local_version: LocalHeader::VERSION,
            version_made: CentralDirHeader::VERSION_MADE,
            version_needed: CentralDirHeader::VERSION_NEEDED,
            flags: 0,
            compression: CompressionMethod::Store,
            modified,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            disk_start: 0,
            internal_attributes: 0,
            external_attributes: 0,
            offset: 0,
            local_extra: None,
            extra: None,
            comment: None,
        }
    }

    /// Stored name, `\` separated
    pub fn stored_name(&self) -> Vec<u8> {
        match &self.raw_name {
            Some(raw) => raw.clone(),
            None => path::to_stored(&self.name).into_bytes(),
        }
    }

    pub fn rename(&mut self, name: String) {
        if name != self.name {
            self.raw_name = None;
            self.name = name;
        }
    }

    /// Moves the entry below the `base` folder
    pub fn rebase(&mut self, base: Option<&str>) {
        let name = path::with_base(base, &self.name);
        if let Some(raw) = &mut self.raw_name {
            let prefix = &name[..name.len() - self.name.len()];
            raw.splice(0..0, path::to_stored(prefix).into_bytes());
        }
        self.name = name;
    }

    pub fn handles(&self) -> impl Iterator<Item = BufferHandle> {
        [self.local_extra, self.extra, self.comment].into_iter().flatten()
    }

    /// Drops this entry's references into `buffers`
    pub fn release(&self, buffers: &mut SharedBufferTable) {
        for handle in self.handles() {
            buffers.release(handle);
        }
    }

    pub fn local_header(
        &self,
        buffers: &SharedBufferTable,
        signature: Option<u32>,
    ) -> Result<LocalHeader> {
        Ok(LocalHeader {
            signature: signature.unwrap_or(self.local_signature),
            version: self.local_version,
            flags: self.flags,
            compression: self.compression,
            modified: self.modified,
            crc32: self.crc32,
            compressed_size: self.compressed_size,
            uncompressed_size: self.uncompressed_size,
            filename_length: self.name_length()?,
            extra_length: blob_length(buffers, self.local_extra)?,
        })
    }

    pub fn central_dir_header(
        &self,
        buffers: &SharedBufferTable,
        signature: Option<u32>,
        offset: u32,
    ) -> Result<CentralDirHeader> {
        Ok(CentralDirHeader {
            signature: signature.unwrap_or(self.central_signature),
            version_made: self.version_made,
            version_needed: self.version_needed,
            flags: self.flags,
            compression: self.compression,
            modified: self.modified,
            crc32: self.crc32,
            compressed_size: self.compressed_size,
            uncompressed_size: self.uncompressed_size,
            filename_length: self.name_length()?,
            extra_length: blob_length(buffers, self.extra)?,
            comment_length: blob_length(buffers, self.comment)?,
            disk_start: self.disk_start,
            internal_attributes: self.internal_attributes,
            external_attributes: self.external_attributes,
            offset,
        })
    }

    pub fn name_length(&self) -> Result<u16> {
        let len = self.raw_name.as_ref().map_or(self.name.len(), Vec::len);
        u16::try_from(len).map_err(|_| Error::InvalidFilename(self.name.clone()))
    }
}

/// An entry that has not joined an archive yet
///
/// Holds its stored payload and its blobs by value; nothing is written to the scratch store or the
/// shared buffer table until the batch it belongs to is committed.
#[derive(Debug, Clone)]
pub(crate) struct Prepared {
    /// Handles are always `None` here
    pub entry: Entry,
    /// Payload as stored, compressed when `entry.compression` says so
    pub payload: Vec<u8>,
    pub local_extra: Option<Vec<u8>>,
    pub extra: Option<Vec<u8>>,
    pub comment: Option<Vec<u8>>,
}

fn blob_length(buffers: &SharedBufferTable, handle: Option<BufferHandle>) -> Result<u16> {
    let len = handle.and_then(|h| buffers.get(h)).map_or(0, <[u8]>::len);
    u16::try_from(len).map_err(|_| Error::InvalidParameter)
}

/// Read-only view of an archived entry
///
/// ```no_run
/// # fn doit() -> mrs_archive::error::Result<()> {
/// let archive = mrs_archive::Archive::open("system.mrs")?;
///
/// for i in 0..archive.len() {
///     let entry = archive.entry(i)?;
///     println!("{} {} bytes, crc {:08x}", entry.name(), entry.size(), entry.crc32());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EntryInfo<'a> {
    pub(crate) entry: &'a Entry,
    pub(crate) buffers: &'a SharedBufferTable,
}

impl<'a> EntryInfo<'a> {
    /// Get the name of the entry, with `/` separators
    ///
    /// # Warnings
    ///
    /// Names read from an archive are not validated. Check them with
    /// [`crate::path::is_valid_name`] before joining them to a path on disk.
    pub fn name(&self) -> &'a str {
        &self.entry.name
    }

    /// Get the CRC32 of the uncompressed content
    pub fn crc32(&self) -> u32 {
        self.entry.crc32
    }

    /// Get the size of the entry, in bytes, when uncompressed
    pub fn size(&self) -> u64 {
        self.entry.uncompressed_size as u64
    }

    /// Get the size of the entry, in bytes, as stored
    pub fn compressed_size(&self) -> u64 {
        self.entry.compressed_size as u64
    }

    pub fn compression_method(&self) -> CompressionMethod {
        self.entry.compression
    }

    /// Get the packed modification time
    pub fn modified_dos(&self) -> DosDateTime {
        self.entry.modified
    }

    /// Get the modification time, in the local timezone
    pub fn modified(&self) -> SystemTime {
        self.entry.modified.to_system_time()
    }

    /// Extra field written after the local header
    pub fn local_extra(&self) -> Option<&'a [u8]> {
        self.entry.local_extra.and_then(|h| self.buffers.get(h))
    }

    /// Extra field written in the central directory
    pub fn extra(&self) -> Option<&'a [u8]> {
        self.entry.extra.and_then(|h| self.buffers.get(h))
    }

    pub fn comment(&self) -> Option<&'a [u8]> {
        self.entry.comment.and_then(|h| self.buffers.get(h))
    }

    pub fn is_directory(&self) -> bool {
        path::is_directory_name(&self.entry.name)
    }
}
