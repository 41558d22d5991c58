//! Types for writing MRS archives
//!

use std::fs::{self, File};
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tracing::{info, instrument, warn};

use crate::archive::{Archive, ArchiveOptions, Source};
use crate::buffers::BufferHandle;
use crate::crypto::{default_encrypt, HeaderKind, Zone};
use crate::entry::Entry;
use crate::error::{Error, ErrorCode, Result};
use crate::path;
use crate::resolver::OnDupe;
use crate::types::BaseHeader;

/// Output of [`Archive::save`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SaveMode {
    /// A single MRS file
    Archive,
    /// One file per entry below a directory
    Directory,
}

/// What a save is doing, reported through the progress callback
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProgressEvent<'a> {
    Begin(&'a str),
    End(&'a str),
    /// The current entry could not be written, saving continues with the next one
    Error(ErrorCode),
    Done,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Progress<'a> {
    /// 1 based index of the current entry
    pub index: usize,
    pub total: usize,
    /// Between 0 and 1, only [`ProgressEvent::Done`] reaches 1
    pub fraction: f64,
    pub event: ProgressEvent<'a>,
}

impl<'a> Progress<'a> {
    fn entry(index: usize, total: usize, event: ProgressEvent<'a>) -> Self {
        Self {
            index,
            total,
            fraction: (index - 1) as f64 / total as f64,
            event,
        }
    }

    fn done(total: usize) -> Self {
        Self {
            index: total,
            total,
            fraction: 1.0,
            event: ProgressEvent::Done,
        }
    }
}

fn position<W: Seek>(writer: &mut W) -> Result<u32> {
    u32::try_from(writer.stream_position()?).map_err(|_| Error::ArchiveTooLarge)
}

impl Archive {
    /// Saves the archive as a single file or as a directory tree
    ///
    /// ```no_run
    /// # fn doit() -> mrs_archive::error::Result<()> {
    /// use mrs_archive::{Archive, ProgressEvent, SaveMode};
    ///
    /// let mut archive = Archive::open("interface.mrs")?;
    /// archive.save(SaveMode::Directory, "interface", |progress| {
    ///     if let ProgressEvent::Begin(name) = progress.event {
    ///         println!("[{:3.0}%] {name}", progress.fraction * 100.0);
    ///     }
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn save(
        &mut self,
        mode: SaveMode,
        destination: impl AsRef<Path>,
        progress: impl FnMut(Progress<'_>),
    ) -> Result<()> {
        let destination = destination.as_ref();
        match mode {
            SaveMode::Archive => self.save_to_file(destination, progress),
            SaveMode::Directory => self.save_to_directory(destination, progress),
        }
    }

    #[instrument(skip(self, progress), err)]
    fn save_to_file(&mut self, destination: &Path, progress: impl FnMut(Progress<'_>)) -> Result<()> {
        if destination.is_dir() {
            return Err(Error::InvalidFilename(destination.display().to_string()));
        }

        let file = File::create(destination)
            .map_err(|_| Error::CannotSave(destination.to_path_buf()))?;
        let mut writer = BufWriter::new(file);
        self.save_to_writer(&mut writer, progress)?;
        writer.flush()?;

        info!(entries = self.len(), "saved archive");
        Ok(())
    }

    /// Serializes the archive into `writer`
    ///
    /// Offsets recorded in the archive are positions in `writer`.
    #[instrument(skip_all, err)]
    pub fn save_to_writer<W: Write + Seek>(
        &mut self,
        writer: &mut W,
        mut progress: impl FnMut(Progress<'_>),
    ) -> Result<()> {
        let cipher = self.encryption.resolve(default_encrypt);
        let local_signature = self.signatures.override_for(HeaderKind::Local);
        let central_signature = self.signatures.override_for(HeaderKind::CentralDir);

        let total = self.entries.len();
        let entry_count = u16::try_from(total).map_err(|_| Error::ArchiveTooLarge)?;

        // Local headers and payloads
        let mut offsets = Vec::with_capacity(total);
        for (i, entry) in self.entries.iter().enumerate() {
            progress(Progress::entry(i + 1, total, ProgressEvent::Begin(&entry.name)));
            offsets.push(position(writer)?);

            let mut header = entry.local_header(&self.buffers, local_signature)?.to_bytes()?;
            cipher.apply(Zone::LocalHeader, &mut header);
            writer.write_all(&header)?;

            let mut name = entry.stored_name();
            cipher.apply(Zone::LocalHeader, &mut name);
            writer.write_all(&name)?;

            let mut extra = blob(self, entry.local_extra);
            cipher.apply(Zone::LocalHeader, &mut extra);
            writer.write_all(&extra)?;

            let mut payload = self
                .scratch
                .read(entry.offset, entry.compressed_size as usize)?;
            if entry.compressed_size > 0 {
                cipher.apply(Zone::Buffer, &mut payload);
            }
            writer.write_all(&payload)?;

            progress(Progress::entry(i + 1, total, ProgressEvent::End(&entry.name)));
        }

        // Central directory, then the base header
        let directory_offset = position(writer)?;
        let mut directory = Vec::new();
        for (entry, offset) in self.entries.iter().zip(offsets) {
            directory.extend(
                entry
                    .central_dir_header(&self.buffers, central_signature, offset)?
                    .to_bytes()?,
            );
            directory.extend(entry.stored_name());
            directory.extend(blob(self, entry.extra));
            directory.extend(blob(self, entry.comment));
        }
        let directory_size = u32::try_from(directory.len()).map_err(|_| Error::ArchiveTooLarge)?;
        cipher.apply(Zone::CentralDirHeader, &mut directory);
        writer.write_all(&directory)?;

        let trailer = BaseHeader {
            signature: self
                .signatures
                .override_for(HeaderKind::Base)
                .unwrap_or(BaseHeader::SIGNATURE),
            entry_count,
            total_entry_count: entry_count,
            directory_size,
            directory_offset,
            ..Default::default()
        };
        let mut raw = trailer.to_bytes()?;
        cipher.apply(Zone::BaseHeader, &mut raw);
        writer.write_all(&raw)?;

        self.trailer = trailer;
        progress(Progress::done(total));
        Ok(())
    }

    /// Writes every entry as a file below `destination`
    ///
    /// Entries that cannot be written are reported through `progress` and skipped.
    #[instrument(skip(self, progress), err)]
    fn save_to_directory(
        &self,
        destination: &Path,
        mut progress: impl FnMut(Progress<'_>),
    ) -> Result<()> {
        if destination.exists() && !destination.is_dir() {
            return Err(Error::InvalidFilename(destination.display().to_string()));
        }
        fs::create_dir_all(destination).map_err(|_| Error::CannotSave(destination.to_path_buf()))?;

        let total = self.entries.len();
        for (i, entry) in self.entries.iter().enumerate() {
            progress(Progress::entry(i + 1, total, ProgressEvent::Begin(&entry.name)));

            if let Err(error) = self.extract(i, entry, destination) {
                warn!(name = %entry.name, %error, "unable to extract entry");
                progress(Progress::entry(i + 1, total, ProgressEvent::Error(error.code())));
            }

            progress(Progress::entry(i + 1, total, ProgressEvent::End(&entry.name)));
        }

        info!(entries = total, "extracted archive");
        progress(Progress::done(total));
        Ok(())
    }

    fn extract(&self, index: usize, entry: &Entry, destination: &Path) -> Result<()> {
        if path::is_directory_name(&entry.name) {
            return Ok(());
        }
        if !path::is_valid_name(&entry.name) {
            return Err(Error::InvalidFilename(entry.name.clone()));
        }

        let target = entry
            .name
            .split('/')
            .fold(destination.to_path_buf(), |target, component| target.join(component));

        let data = self.read(index).map_err(|_| Error::CannotDecompress)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|_| Error::CannotOpen(parent.to_path_buf()))?;
        }
        let mut file = File::create(&target).map_err(|_| Error::CannotOpen(target.clone()))?;
        file.write_all(&data)?;

        let modified = FileTime::from_system_time(entry.modified.to_system_time());
        filetime::set_file_handle_times(&file, None, Some(modified))?;

        Ok(())
    }
}

fn blob(archive: &Archive, handle: Option<BufferHandle>) -> Vec<u8> {
    handle
        .and_then(|handle| archive.buffers.get(handle))
        .map(<[u8]>::to_vec)
        .unwrap_or_default()
}

/// Where [`compile`] writes the archive of `directory` when no output is given
pub fn compiled_path(directory: impl AsRef<Path>) -> PathBuf {
    let mut name = directory.as_ref().components().as_path().as_os_str().to_owned();
    name.push(".mrs");
    PathBuf::from(name)
}

/// Packs a directory into an archive file, `<directory>.mrs` unless `output` is given
///
/// Returns the path of the written archive.
pub fn compile(
    directory: impl AsRef<Path>,
    output: Option<&Path>,
    options: &ArchiveOptions,
    progress: impl FnMut(Progress<'_>),
) -> Result<PathBuf> {
    let directory = directory.as_ref();
    if !directory.is_dir() {
        return Err(Error::CannotOpen(directory.to_path_buf()));
    }

    let output = output.map_or_else(|| compiled_path(directory), Path::to_path_buf);

    let mut archive = Archive::with_options(options);
    archive.add(Source::directory(directory), OnDupe::KeepNew)?;
    archive.save(SaveMode::Archive, &output, progress)?;
    Ok(output)
}

/// Expands an archive file into a directory, named after the archive without its extension
/// unless `output` is given
///
/// Returns the path of the written directory.
pub fn decompile(
    archive: impl AsRef<Path>,
    output: Option<&Path>,
    options: &ArchiveOptions,
    progress: impl FnMut(Progress<'_>),
) -> Result<PathBuf> {
    let archive = archive.as_ref();
    let output = output.map_or_else(|| archive.with_extension(""), Path::to_path_buf);

    let mut opened = Archive::open_with(archive, options)?;
    opened.save(SaveMode::Directory, &output, progress)?;
    Ok(output)
}
