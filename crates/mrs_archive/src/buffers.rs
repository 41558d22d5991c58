//! Reference counted store for entry extra fields and comments.
//!
//! Identical blobs are stored once. Every entry view referencing a blob holds one count, so the
//! local and central directory extra of an entry share a single record when they are equal.

use indexmap::IndexMap;
use tracing::trace;

/// Handle to a record in a [`SharedBufferTable`]
///
/// Handles are never reused, so a handle outliving its record only ever resolves to nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u32);

#[derive(Debug)]
struct SharedBuffer {
    data: Box<[u8]>,
    references: u32,
}

/// Outcome of [`SharedBufferTable::release`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Release {
    /// The record is still referenced this many times
    Decremented(u32),
    /// The last reference was dropped and the bytes freed
    Freed,
    /// No record for this handle
    NotFound,
}

#[derive(Debug, Default)]
pub struct SharedBufferTable {
    records: IndexMap<BufferHandle, SharedBuffer>,
    next: u32,
}

impl SharedBufferTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data`, reusing an identical record when one exists
    pub fn append(&mut self, data: &[u8]) -> BufferHandle {
        if let Some((handle, record)) = self
            .records
            .iter_mut()
            .find(|(_, record)| *record.data == *data)
        {
            record.references += 1;
            trace!(?handle, references = record.references, "shared buffer reused");
            return *handle;
        }

        let handle = BufferHandle(self.next);
        self.next += 1;
        self.records.insert(
            handle,
            SharedBuffer {
                data: data.into(),
                references: 1,
            },
        );
        trace!(?handle, size = data.len(), "shared buffer created");
        handle
    }

    /// Drops one reference to `handle`
    pub fn release(&mut self, handle: BufferHandle) -> Release {
        let Some(record) = self.records.get_mut(&handle) else {
            return Release::NotFound;
        };

        record.references -= 1;
        if record.references > 0 {
            return Release::Decremented(record.references);
        }

        self.records.shift_remove(&handle);
        trace!(?handle, "shared buffer freed");
        Release::Freed
    }

    pub fn get(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.records.get(&handle).map(|record| &*record.data)
    }

    pub fn ref_count(&self, handle: BufferHandle) -> Option<u32> {
        self.records.get(&handle).map(|record| record.references)
    }

    /// Number of distinct records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
