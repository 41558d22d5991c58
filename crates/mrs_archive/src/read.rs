//! Types for reading MRS archives
//!

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, instrument};

use crate::archive::ArchiveOptions;
use crate::crypto::{default_decrypt, Cipher, HeaderKind, Signatures, Zone};
use crate::dostime::DosDateTime;
use crate::entry::{Entry, Prepared};
use crate::error::{Error, Result};
use crate::path;
use crate::types::{BaseHeader, CentralDirHeader, LocalHeader};

/// A central directory record with the variable fields that follow it
#[derive(Debug, Clone)]
pub(crate) struct DirectoryRecord {
    pub header: CentralDirHeader,
    /// `/` separated, with invalid UTF-8 replaced
    pub name: String,
    /// Set when the stored name is not UTF-8
    pub raw_name: Option<Vec<u8>>,
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
}

/// Opens an archive for reading, telling a missing file apart from one that can't be opened
pub(crate) fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => Error::NotFound,
        _ => Error::CannotOpen(path.to_path_buf()),
    })
}

fn stream_len<R: Seek>(reader: &mut R) -> Result<u64> {
    Ok(reader.seek(SeekFrom::End(0))?)
}

/// Reads `len` bytes at `offset`, failing as an invalid archive if they lie past `total`
fn read_span<R: Read + Seek>(reader: &mut R, total: u64, offset: u64, len: u64) -> Result<Vec<u8>> {
    match offset.checked_add(len) {
        Some(end) if end <= total => {}
        _ => return Err(Error::InvalidArchive),
    }

    reader.seek(SeekFrom::Start(offset))?;

    let mut out = vec![0u8; len as usize];
    reader.read_exact(&mut out).map_err(|error| match error.kind() {
        io::ErrorKind::UnexpectedEof => Error::InvalidArchive,
        _ => Error::IOError(error),
    })?;
    Ok(out)
}

fn check_signature(
    signatures: &Signatures,
    kind: HeaderKind,
    raw: &[u8],
    error: fn() -> Error,
) -> Result<()> {
    let signature = LittleEndian::read_u32(raw);
    if signatures.is_valid(kind, signature) {
        return Ok(());
    }

    debug!(?kind, signature = %format!("{signature:#010x}"), "rejected signature");
    Err(error())
}

/// Reads and decrypts the trailing base header
#[instrument(skip_all, err)]
pub(crate) fn read_base_header<R: Read + Seek>(
    reader: &mut R,
    cipher: &Cipher,
    signatures: &Signatures,
) -> Result<BaseHeader> {
    let total = stream_len(reader)?;
    if total < BaseHeader::SIZE as u64 {
        return Err(Error::InvalidArchive);
    }

    let mut raw = read_span(reader, total, total - BaseHeader::SIZE as u64, BaseHeader::SIZE as u64)?;
    cipher.apply(Zone::BaseHeader, &mut raw);
    check_signature(signatures, HeaderKind::Base, &raw, || Error::InvalidArchive)?;

    BaseHeader::from_bytes(&raw)
}

fn take<'a>(block: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let span = block.get(*pos..*pos + len).ok_or(Error::InvalidArchive)?;
    *pos += len;
    Ok(span)
}

/// Reads, decrypts and splits the central directory block described by `header`
#[instrument(skip_all, err, fields(entries = header.entry_count))]
pub(crate) fn read_directory<R: Read + Seek>(
    reader: &mut R,
    header: &BaseHeader,
    cipher: &Cipher,
    signatures: &Signatures,
) -> Result<Vec<DirectoryRecord>> {
    let total = stream_len(reader)?;
    let mut block = read_span(
        reader,
        total,
        header.directory_offset as u64,
        header.directory_size as u64,
    )?;
    cipher.apply(Zone::CentralDirHeader, &mut block);

    let mut pos = 0;
    let mut records = Vec::with_capacity(header.entry_count as usize);
    for _ in 0..header.entry_count {
        let fixed = take(&block, &mut pos, CentralDirHeader::SIZE)?;
        check_signature(signatures, HeaderKind::CentralDir, fixed, || {
            Error::InvalidEncryption
        })?;
        let dh = CentralDirHeader::from_bytes(fixed).map_err(|_| Error::InvalidArchive)?;

        let stored = take(&block, &mut pos, dh.filename_length as usize)?;
        let (name, raw_name) = match std::str::from_utf8(stored) {
            Ok(name) => (path::to_internal(name), None),
            Err(_) => (
                path::to_internal(&String::from_utf8_lossy(stored)),
                Some(stored.to_vec()),
            ),
        };
        let extra = take(&block, &mut pos, dh.extra_length as usize)?.to_vec();
        let comment = take(&block, &mut pos, dh.comment_length as usize)?.to_vec();

        records.push(DirectoryRecord {
            header: dh,
            name,
            raw_name,
            extra,
            comment,
        });
    }

    Ok(records)
}

/// Reads every entry described by `header`, payloads included
#[instrument(skip_all, err)]
pub(crate) fn read_entries<R: Read + Seek>(
    reader: &mut R,
    header: &BaseHeader,
    cipher: &Cipher,
    signatures: &Signatures,
) -> Result<Vec<Prepared>> {
    let records = read_directory(reader, header, cipher, signatures)?;
    let total = stream_len(reader)?;

    records
        .into_iter()
        .map(|record| -> Result<Prepared> {
            let dh = record.header;
            let local_start = dh.offset as u64;

            let mut raw = read_span(reader, total, local_start, LocalHeader::SIZE as u64)?;
            cipher.apply(Zone::LocalHeader, &mut raw);
            check_signature(signatures, HeaderKind::Local, &raw, || Error::InvalidEncryption)?;
            let lh = LocalHeader::from_bytes(&raw).map_err(|_| Error::InvalidArchive)?;

            let extra_start = local_start + LocalHeader::SIZE as u64 + lh.filename_length as u64;
            let mut local_extra = read_span(reader, total, extra_start, lh.extra_length as u64)?;
            cipher.apply(Zone::LocalHeader, &mut local_extra);

            let data_start = extra_start + lh.extra_length as u64;
            let mut payload = read_span(reader, total, data_start, dh.compressed_size as u64)?;
            if dh.compressed_size > 0 {
                cipher.apply(Zone::Buffer, &mut payload);
            }

            debug!(name = %record.name, size = dh.uncompressed_size, "read entry");

            let entry = Entry {
                local_signature: lh.signature,
                central_signature: dh.signature,
                local_version: lh.version,
                version_made: dh.version_made,
                version_needed: dh.version_needed,
                flags: dh.flags,
                compression: dh.compression,
                crc32: dh.crc32,
                compressed_size: dh.compressed_size,
                uncompressed_size: dh.uncompressed_size,
                disk_start: dh.disk_start,
                internal_attributes: dh.internal_attributes,
                external_attributes: dh.external_attributes,
                raw_name: record.raw_name,
                ..Entry::new(record.name, dh.modified)
            };

            Ok(Prepared {
                entry,
                payload,
                local_extra: non_empty(local_extra),
                extra: non_empty(record.extra),
                comment: non_empty(record.comment),
            })
        })
        .collect()
}

fn non_empty(blob: Vec<u8>) -> Option<Vec<u8>> {
    (!blob.is_empty()).then_some(blob)
}

/// An entry as described by the central directory of an archive on disk
#[derive(Debug, Clone, PartialEq)]
pub struct ListedEntry {
    /// Name with `/` separators
    pub name: String,
    pub crc32: u32,
    /// Size in bytes when uncompressed
    pub size: u64,
    /// Size in bytes as stored
    pub compressed_size: u64,
    pub modified: DosDateTime,
}

/// Iterator over the central directory of an archive, see [`list`]
#[derive(Debug)]
pub struct Listing {
    records: std::vec::IntoIter<DirectoryRecord>,
}

impl Iterator for Listing {
    type Item = ListedEntry;

    fn next(&mut self) -> Option<ListedEntry> {
        self.records.next().map(|record| ListedEntry {
            name: record.name,
            crc32: record.header.crc32,
            size: record.header.uncompressed_size as u64,
            compressed_size: record.header.compressed_size as u64,
            modified: record.header.modified,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for Listing {}

/// Lists the entries of an archive from its central directory, without reading any payload
///
/// Only the decryption and signature settings of `options` are used.
///
/// ```no_run
/// # fn doit() -> mrs_archive::error::Result<()> {
/// use mrs_archive::ArchiveOptions;
///
/// for entry in mrs_archive::read::list("model.mrs", &ArchiveOptions::default())? {
///     println!("{} ({} bytes)", entry.name, entry.size);
/// }
/// # Ok(())
/// # }
/// ```
pub fn list(path: impl AsRef<Path>, options: &ArchiveOptions) -> Result<Listing> {
    list_reader(&mut open_input(path.as_ref())?, options)
}

/// Same as [`list`], reading from any seekable source
pub fn list_reader<R: Read + Seek>(reader: &mut R, options: &ArchiveOptions) -> Result<Listing> {
    let cipher = options.decryption.resolve(default_decrypt);

    let header = read_base_header(reader, &cipher, &options.signatures)?;
    if header.entry_count == 0 {
        return Err(Error::Empty);
    }

    let records = read_directory(reader, &header, &cipher, &options.signatures)?;
    Ok(Listing {
        records: records.into_iter(),
    })
}

/// Checks that a file ends with a base header carrying an accepted signature
pub fn verify(path: impl AsRef<Path>, options: &ArchiveOptions) -> Result<()> {
    let cipher = options.decryption.resolve(default_decrypt);
    read_base_header(&mut open_input(path.as_ref())?, &cipher, &options.signatures).map(|_| ())
}
