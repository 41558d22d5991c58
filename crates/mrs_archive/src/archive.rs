//! The archive handle: entry list, ingestion and in-place editing
//!

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::time::SystemTime;

use bon::Builder;
use tracing::{debug, info, instrument};

use crate::buffers::{BufferHandle, SharedBufferTable};
use crate::compression::{self, CompressionMethod, CompressionProvider, Deflate};
use crate::crypto::{
    default_decrypt, CipherSet, HeaderKind, SignatureCheck, Signatures, Transform, Zones,
};
use crate::dostime::DosDateTime;
use crate::entry::{Entry, EntryInfo, Prepared};
use crate::error::{Error, Result};
use crate::ledger::{LedgerMatch, ReplaceLedger};
use crate::path;
use crate::read::{open_input, read_base_header, read_entries};
use crate::resolver::{self, OnDupe, Placement};
use crate::scratch::ScratchStore;
use crate::types::BaseHeader;
use crate::walk::list_directory_recursive;

/// Where entry payloads are kept between ingestion and save
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Storage {
    /// An anonymous temporary file, falling back to memory if none can be created
    #[default]
    TempFile,
    Memory,
}

/// Options for creating or opening an [`Archive`]
///
/// ```
/// use mrs_archive::{ArchiveOptions, crypto::Zones};
///
/// let mut options = ArchiveOptions::builder()
///     .compression_level(6)
///     .storage(mrs_archive::archive::Storage::Memory)
///     .build();
/// options.signatures.set_override(Zones::BASE_HEADER, Some(0x0503_0207));
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ArchiveOptions {
    #[builder(default)]
    pub storage: Storage,

    /// Deflate level, 0 to 9
    #[builder(default = Deflate::DEFAULT_LEVEL)]
    pub compression_level: u32,

    #[builder(default)]
    pub encryption: CipherSet,

    #[builder(default)]
    pub decryption: CipherSet,

    #[builder(default)]
    pub signatures: Signatures,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Something to add to an archive, see [`Archive::add`]
pub enum Source<'a> {
    /// A single file, named after its file name unless `name` is given
    File { path: &'a Path, name: Option<String> },

    /// Every file below a directory, named relative to it and placed under `base`
    Directory { path: &'a Path, base: Option<String> },

    /// Every entry of an archive on disk, read with this archive's decryption settings
    ArchiveFile { path: &'a Path, base: Option<String> },

    /// Every entry of an open archive
    Archive { archive: &'a Archive, base: Option<String> },

    /// Bytes in memory, stamped with the current time unless `modified` is given
    Buffer {
        data: &'a [u8],
        name: String,
        modified: Option<SystemTime>,
    },

    /// Everything left in a reader
    Stream { reader: &'a mut dyn Read, name: String },

    /// An open file, read from its current position
    Handle { file: &'a File, name: String },
}

impl<'a> Source<'a> {
    pub fn file<P: AsRef<Path> + ?Sized>(path: &'a P) -> Self {
        Source::File {
            path: path.as_ref(),
            name: None,
        }
    }

    pub fn directory<P: AsRef<Path> + ?Sized>(path: &'a P) -> Self {
        Source::Directory {
            path: path.as_ref(),
            base: None,
        }
    }

    pub fn archive_file<P: AsRef<Path> + ?Sized>(path: &'a P) -> Self {
        Source::ArchiveFile {
            path: path.as_ref(),
            base: None,
        }
    }

    pub fn buffer(data: &'a [u8], name: impl Into<String>) -> Self {
        Source::Buffer {
            data,
            name: name.into(),
            modified: None,
        }
    }
}

/// An MRS archive being built or edited
///
/// Payloads live in a scratch store until the archive is saved; nothing touches the file it was
/// opened from after [`Archive::open`] returns.
///
/// ```no_run
/// # fn doit() -> mrs_archive::error::Result<()> {
/// use mrs_archive::{Archive, OnDupe, SaveMode, Source};
///
/// let mut archive = Archive::new();
/// archive.add(Source::directory("model"), OnDupe::KeepNew)?;
/// archive.add(Source::buffer(b"version=2", "version.ini"), OnDupe::KeepNew)?;
/// archive.save(SaveMode::Archive, "model.mrs", |_| {})?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Archive {
    pub(crate) entries: Vec<Entry>,
    pub(crate) buffers: SharedBufferTable,
    pub(crate) scratch: ScratchStore,
    pub(crate) encryption: CipherSet,
    pub(crate) decryption: CipherSet,
    pub(crate) signatures: Signatures,
    pub(crate) compressor: Box<dyn CompressionProvider>,
    pub(crate) trailer: BaseHeader,
}

impl Default for Archive {
    fn default() -> Self {
        Self::new()
    }
}

impl Archive {
    /// Creates an empty archive with default options
    pub fn new() -> Self {
        Self::with_options(&ArchiveOptions::default())
    }

    pub fn with_options(options: &ArchiveOptions) -> Self {
        let scratch = match options.storage {
            Storage::TempFile => ScratchStore::new(),
            Storage::Memory => ScratchStore::in_memory(),
        };

        Self {
            entries: Vec::new(),
            buffers: SharedBufferTable::new(),
            scratch,
            encryption: options.encryption.clone(),
            decryption: options.decryption.clone(),
            signatures: options.signatures.clone(),
            compressor: Box::new(Deflate::new(options.compression_level)),
            trailer: BaseHeader::default(),
        }
    }

    /// Opens an archive file with default options
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &ArchiveOptions::default())
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn open_with(path: impl AsRef<Path>, options: &ArchiveOptions) -> Result<Self> {
        let mut file = open_input(path.as_ref())?;
        Self::from_reader(&mut file, options)
    }

    /// Loads an archive from any seekable source
    ///
    /// Entries are taken as stored, even when their names collide or are not valid paths.
    pub fn from_reader<R: Read + Seek>(reader: &mut R, options: &ArchiveOptions) -> Result<Self> {
        let mut archive = Self::with_options(options);
        let cipher = archive.decryption.resolve(default_decrypt);

        let header = read_base_header(reader, &cipher, &archive.signatures)?;
        let batch = read_entries(reader, &header, &cipher, &archive.signatures)?;
        archive.commit(batch, ReplaceLedger::new())?;
        archive.trailer = header;

        info!(entries = archive.len(), "opened archive");
        Ok(archive)
    }

    /// Adds the content of `source`, returning how many entries were added or replaced
    ///
    /// The whole source is one batch: when any of its entries is rejected, the archive is left
    /// untouched.
    pub fn add(&mut self, source: Source<'_>, on_dupe: OnDupe) -> Result<usize> {
        let batch = self.collect(source)?;
        self.ingest(batch, on_dupe)
    }

    fn collect(&self, source: Source<'_>) -> Result<Vec<Prepared>> {
        match source {
            Source::File { path, name } => {
                let name = match name {
                    Some(name) => name,
                    None => path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .ok_or_else(|| Error::InvalidFilename(path.display().to_string()))?
                        .to_owned(),
                };
                let file = open_input(path)?;
                Ok(vec![self.pack_file(&file, path, path::to_internal(&name))?])
            }
            Source::Directory { path, base } => {
                let files = list_directory_recursive(path)?;
                if files.is_empty() {
                    return Err(Error::EmptyFolder);
                }

                files
                    .iter()
                    .map(|walked| {
                        let file = File::open(&walked.absolute)
                            .map_err(|_| Error::CannotOpen(walked.absolute.clone()))?;
                        let name = path::with_base(base.as_deref(), &walked.relative);
                        self.pack_file(&file, &walked.absolute, name)
                    })
                    .collect()
            }
            Source::ArchiveFile { path, base } => {
                let mut file = open_input(path)?;
                let cipher = self.decryption.resolve(default_decrypt);
                let header = read_base_header(&mut file, &cipher, &self.signatures)?;
                let mut batch = read_entries(&mut file, &header, &cipher, &self.signatures)?;
                for prepared in &mut batch {
                    prepared.entry.rebase(base.as_deref());
                }
                Ok(batch)
            }
            Source::Archive { archive, base } => archive
                .entries
                .iter()
                .map(|entry| archive.export(entry, base.as_deref()))
                .collect(),
            Source::Buffer {
                data,
                name,
                modified,
            } => {
                let modified = modified.map_or_else(DosDateTime::now, DosDateTime::from_system_time);
                Ok(vec![self.pack(path::to_internal(&name), data, modified)?])
            }
            Source::Stream { reader, name } => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                Ok(vec![self.pack(path::to_internal(&name), &data, DosDateTime::now())?])
            }
            Source::Handle { file, name } => {
                let mut data = Vec::new();
                let mut reader = file;
                reader.read_to_end(&mut data)?;
                let modified = file
                    .metadata()
                    .and_then(|m| m.modified())
                    .map_or_else(|_| DosDateTime::now(), DosDateTime::from_system_time);
                Ok(vec![self.pack(path::to_internal(&name), &data, modified)?])
            }
        }
    }

    fn pack_file(&self, file: &File, path: &Path, name: String) -> Result<Prepared> {
        let mut data = Vec::new();
        let mut reader = file;
        reader
            .read_to_end(&mut data)
            .map_err(|_| Error::CannotOpen(path.to_path_buf()))?;

        let modified = file
            .metadata()
            .and_then(|m| m.modified())
            .map_or_else(|_| DosDateTime::now(), DosDateTime::from_system_time);

        self.pack(name, &data, modified)
    }

    /// Compresses `content` into a new entry
    pub(crate) fn pack(&self, name: String, content: &[u8], modified: DosDateTime) -> Result<Prepared> {
        let uncompressed_size = u32::try_from(content.len()).map_err(|_| Error::ArchiveTooLarge)?;

        let mut entry = Entry::new(name, modified);
        entry.crc32 = compression::crc32(content);
        entry.uncompressed_size = uncompressed_size;

        let payload = match self.compressor.compress(content) {
            Some(compressed) => {
                entry.compression = CompressionMethod::Deflate;
                compressed
            }
            None => content.to_vec(),
        };
        entry.compressed_size = u32::try_from(payload.len()).map_err(|_| Error::ArchiveTooLarge)?;

        Ok(Prepared {
            entry,
            payload,
            local_extra: None,
            extra: None,
            comment: None,
        })
    }

    /// Copies one of this archive's entries out as a stored payload plus its blobs
    fn export(&self, entry: &Entry, base: Option<&str>) -> Result<Prepared> {
        let blob = |handle| self.buffers.get(handle).map(<[u8]>::to_vec);

        let mut exported = Entry {
            local_extra: None,
            extra: None,
            comment: None,
            ..entry.clone()
        };
        exported.rebase(base);

        Ok(Prepared {
            entry: exported,
            payload: self
                .scratch
                .read(entry.offset, entry.compressed_size as usize)?,
            local_extra: entry.local_extra.and_then(blob),
            extra: entry.extra.and_then(blob),
            comment: entry.comment.and_then(blob),
        })
    }

    /// Resolves the names of a batch against the live entries and commits it
    #[instrument(skip_all, fields(size = batch.len(), ?on_dupe), err)]
    fn ingest(&mut self, batch: Vec<Prepared>, on_dupe: OnDupe) -> Result<usize> {
        let live_len = self.entries.len();
        let mut ledger = ReplaceLedger::new();
        let mut prepared: Vec<Prepared> = Vec::with_capacity(batch.len());

        for mut candidate in batch {
            check_name(&candidate.entry)?;

            let names = self
                .entries
                .iter()
                .map(|e| e.name.as_str())
                .chain(prepared.iter().map(|p| p.entry.name.as_str()));

            match resolver::place(names, &candidate.entry.name, on_dupe)? {
                Placement::Replace(live) if live < live_len => {
                    let earlier = ledger
                        .iter()
                        .find_map(|(replaced, earlier)| (replaced == live).then_some(earlier));
                    match earlier {
                        Some(earlier) => prepared[earlier] = candidate,
                        None => {
                            ledger.record(live, prepared.len());
                            prepared.push(candidate);
                        }
                    }
                }
                Placement::Replace(index) => prepared[index - live_len] = candidate,
                Placement::New(name) => {
                    candidate.entry.rename(name);
                    check_name(&candidate.entry)?;
                    prepared.push(candidate);
                }
            }
        }

        self.commit(prepared, ledger)
    }

    /// Writes the payloads of `batch` to the scratch store, then moves its entries into the list
    fn commit(&mut self, mut batch: Vec<Prepared>, mut ledger: ReplaceLedger) -> Result<usize> {
        for prepared in &mut batch {
            prepared.entry.offset = self.scratch.write(&prepared.payload)?;
        }

        let count = batch.len();
        for (index, prepared) in batch.into_iter().enumerate() {
            let mut entry = prepared.entry;
            entry.local_extra = prepared.local_extra.map(|blob| self.buffers.append(&blob));
            entry.extra = prepared.extra.map(|blob| self.buffers.append(&blob));
            entry.comment = prepared.comment.map(|blob| self.buffers.append(&blob));

            match ledger.take(index, self.entries.len()) {
                LedgerMatch::Replace(live) => {
                    debug!(name = %entry.name, live, "replacing entry");
                    self.entries[live].release(&mut self.buffers);
                    self.entries[live] = entry;
                }
                LedgerMatch::Stale(_) | LedgerMatch::Append => {
                    debug!(name = %entry.name, "adding entry");
                    self.entries.push(entry);
                }
            }
        }

        Ok(count)
    }

    fn get(&self, index: usize) -> Result<&Entry> {
        self.entries.get(index).ok_or(Error::InvalidIndex(index))
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Entry> {
        self.entries.get_mut(index).ok_or(Error::InvalidIndex(index))
    }

    /// Removes an entry, shifting every following entry down by one
    pub fn remove(&mut self, index: usize) -> Result<()> {
        self.get(index)?;
        let entry = self.entries.remove(index);
        entry.release(&mut self.buffers);
        debug!(name = %entry.name, index, "removed entry");
        Ok(())
    }

    /// Reads the uncompressed content of an entry
    #[instrument(skip(self), err)]
    pub fn read(&self, index: usize) -> Result<Vec<u8>> {
        let entry = self.get(index)?;
        let stored = self
            .scratch
            .read(entry.offset, entry.compressed_size as usize)?;

        match entry.compression {
            CompressionMethod::Store => Ok(stored),
            CompressionMethod::Deflate => self
                .compressor
                .decompress(&stored, entry.uncompressed_size as usize),
        }
    }

    /// Replaces the content of an entry, keeping its name, time and blobs
    #[instrument(skip(self, data), fields(size = data.len()), err)]
    pub fn write(&mut self, index: usize, data: &[u8]) -> Result<()> {
        let modified = self.get(index)?.modified;
        let packed = self.pack(String::new(), data, modified)?;
        let offset = self.scratch.write(&packed.payload)?;

        let entry = self.get_mut(index)?;
        entry.compression = packed.entry.compression;
        entry.crc32 = packed.entry.crc32;
        entry.compressed_size = packed.entry.compressed_size;
        entry.uncompressed_size = packed.entry.uncompressed_size;
        entry.offset = offset;
        Ok(())
    }

    pub fn entry(&self, index: usize) -> Result<EntryInfo<'_>> {
        Ok(EntryInfo {
            entry: self.get(index)?,
            buffers: &self.buffers,
        })
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = EntryInfo<'_>> {
        self.entries.iter().map(|entry| EntryInfo {
            entry,
            buffers: &self.buffers,
        })
    }

    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Index of the first entry named `name`, ignoring ASCII case
    pub fn find(&self, name: &str) -> Option<usize> {
        let name = path::to_internal(name);
        self.entries
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(&name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renames an entry, failing if another entry already has that name
    pub fn set_name(&mut self, index: usize, name: &str) -> Result<()> {
        self.get(index)?;

        let name = path::to_internal(name);
        if !path::is_valid_name(&name) || name.len() > u16::MAX as usize {
            return Err(Error::InvalidFilename(name));
        }

        let taken = self
            .entries
            .iter()
            .enumerate()
            .any(|(i, e)| i != index && e.name.eq_ignore_ascii_case(&name));
        if taken {
            return Err(Error::Duplicate(name));
        }

        self.get_mut(index)?.rename(name);
        Ok(())
    }

    pub fn set_modified(&mut self, index: usize, modified: SystemTime) -> Result<()> {
        self.get_mut(index)?.modified = DosDateTime::from_system_time(modified);
        Ok(())
    }

    /// Sets the extra field written after the local header, `None` or empty clears it
    pub fn set_local_extra(&mut self, index: usize, data: Option<&[u8]>) -> Result<()> {
        self.set_blob(index, data, |entry| &mut entry.local_extra)
    }

    /// Sets the extra field written in the central directory, `None` or empty clears it
    pub fn set_extra(&mut self, index: usize, data: Option<&[u8]>) -> Result<()> {
        self.set_blob(index, data, |entry| &mut entry.extra)
    }

    pub fn set_comment(&mut self, index: usize, data: Option<&[u8]>) -> Result<()> {
        self.set_blob(index, data, |entry| &mut entry.comment)
    }

    fn set_blob(
        &mut self,
        index: usize,
        data: Option<&[u8]>,
        field: fn(&mut Entry) -> &mut Option<BufferHandle>,
    ) -> Result<()> {
        let data = data.filter(|d| !d.is_empty());
        if data.is_some_and(|d| d.len() > u16::MAX as usize) {
            return Err(Error::InvalidParameter);
        }

        let entry = self.entries.get_mut(index).ok_or(Error::InvalidIndex(index))?;
        let slot = field(entry);
        if let Some(old) = slot.take() {
            self.buffers.release(old);
        }
        *slot = data.map(|d| self.buffers.append(d));
        Ok(())
    }

    /// Registers encryption transforms for `zones`, `None` restores the default
    pub fn set_encryption(&mut self, zones: Zones, transform: Option<Transform>) {
        self.encryption.set(zones, transform);
    }

    /// Registers decryption transforms for `zones`, `None` restores the default
    pub fn set_decryption(&mut self, zones: Zones, transform: Option<Transform>) {
        self.decryption.set(zones, transform);
    }

    /// Sets the signature written for the headers in `zones`; it is also accepted when reading
    pub fn set_signature(&mut self, zones: Zones, value: Option<u32>) {
        self.signatures.set_override(zones, value);
    }

    pub fn set_signature_check(&mut self, check: Option<SignatureCheck>) {
        self.signatures.set_check(check);
    }

    pub fn set_known_signatures(&mut self, kind: HeaderKind, values: impl IntoIterator<Item = u32>) {
        self.signatures.set_known(kind, values);
    }

    pub fn set_compressor(&mut self, compressor: impl CompressionProvider + 'static) {
        self.compressor = Box::new(compressor);
    }

    /// Base header of the last load or save
    pub fn trailer(&self) -> &BaseHeader {
        &self.trailer
    }
}

/// Rejects names that are unsafe on disk or too long for a header
fn check_name(entry: &Entry) -> Result<()> {
    if !path::is_valid_name(&entry.name) || entry.name_length().is_err() {
        return Err(Error::InvalidFilename(entry.name.clone()));
    }
    Ok(())
}
