//! Append-only storage for compressed entry payloads.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use tracing::{instrument, warn};

use crate::error::{Error, Result};

#[derive(Debug)]
enum Backing {
    File(File),
    Memory(Vec<u8>),
}

/// Payload bytes of every entry, between ingestion and save
///
/// Writes only ever append, so an offset handed out once stays valid for the life of the store.
/// Every access names its own offset; there is no shared cursor.
#[derive(Debug)]
pub struct ScratchStore {
    backing: Backing,
    len: u64,
}

impl ScratchStore {
    /// Creates a store backed by an anonymous temporary file, or by memory if none can be created
    pub fn new() -> Self {
        match tempfile::tempfile() {
            Ok(file) => Self {
                backing: Backing::File(file),
                len: 0,
            },
            Err(error) => {
                warn!(%error, "unable to create scratch file, keeping payloads in memory");
                Self::in_memory()
            }
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backing: Backing::Memory(Vec::new()),
            len: 0,
        }
    }

    pub fn is_file_backed(&self) -> bool {
        matches!(self.backing, Backing::File(_))
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `data` and returns the offset it was written at
    #[instrument(skip_all, fields(size = data.len()), err)]
    pub fn write(&mut self, data: &[u8]) -> Result<u64> {
        let offset = self.len;

        match &mut self.backing {
            Backing::File(file) => {
                file.seek(SeekFrom::Start(offset))?;
                file.write_all(data)?;
            }
            Backing::Memory(buffer) => buffer.extend_from_slice(data),
        }

        self.len += data.len() as u64;
        Ok(offset)
    }

    /// Reads `len` bytes written at `offset`
    #[instrument(skip(self), err)]
    pub fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }

        let end = offset.checked_add(len as u64).ok_or(Error::InvalidParameter)?;
        if offset >= self.len || end > self.len {
            return Err(Error::InvalidParameter);
        }

        match &self.backing {
            Backing::File(file) => {
                let mut file = file;
                file.seek(SeekFrom::Start(offset))?;

                let mut out = vec![0u8; len];
                file.read_exact(&mut out)?;
                Ok(out)
            }
            Backing::Memory(buffer) => Ok(buffer[offset as usize..end as usize].to_vec()),
        }
    }
}

impl Default for ScratchStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::ScratchStore;
    use crate::error::{Error, Result};

    fn exercise(mut store: ScratchStore) -> Result<()> {
        assert!(store.is_empty());

        assert_eq!(store.write(b"hello")?, 0);
        assert_eq!(store.write(b"")?, 5);
        assert_eq!(store.write(b" world")?, 5);
        assert_eq!(store.len(), 11);

        assert_eq!(store.read(6, 5)?, b"world".to_vec());
        assert_eq!(store.read(0, 5)?, b"hello".to_vec());
        assert_eq!(store.read(0, 11)?, b"hello world".to_vec());
        assert_eq!(store.read(11, 0)?, Vec::<u8>::new());

        assert!(matches!(store.read(11, 1), Err(Error::InvalidParameter)));
        assert!(matches!(store.read(8, 4), Err(Error::InvalidParameter)));

        Ok(())
    }

    #[traced_test]
    #[test]
    fn file_backed() -> Result<()> {
        let store = ScratchStore::new();
        assert!(store.is_file_backed());
        exercise(store)
    }

    #[traced_test]
    #[test]
    fn memory_backed() -> Result<()> {
        let store = ScratchStore::in_memory();
        assert!(!store.is_file_backed());
        exercise(store)
    }

    #[test]
    fn interleaved_reads_and_writes() -> Result<()> {
        let mut store = ScratchStore::new();

        let first = store.write(b"first")?;
        assert_eq!(store.read(first, 5)?, b"first".to_vec());

        let second = store.write(b"second")?;
        assert_eq!(store.read(first, 5)?, b"first".to_vec());
        assert_eq!(store.read(second, 6)?, b"second".to_vec());

        Ok(())
    }
}
