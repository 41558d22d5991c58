//! Bookkeeping of which live entries a batch of prepared entries overwrites.

use indexmap::IndexMap;
use tracing::{trace, warn};

/// Outcome of looking up a prepared entry in the [`ReplaceLedger`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LedgerMatch {
    /// Overwrite the live entry at this index
    Replace(usize),
    /// A record existed but its live index is gone; append instead
    Stale(usize),
    /// No record; append
    Append,
}

/// Pairs of (live index, prepared index) recorded while scanning a batch
#[derive(Debug, Default)]
pub struct ReplaceLedger {
    // keyed by prepared index
    records: IndexMap<usize, usize>,
}

impl ReplaceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notes that prepared entry `prepared` must overwrite live entry `live`
    pub fn record(&mut self, live: usize, prepared: usize) {
        trace!(live, prepared, "replace recorded");
        self.records.insert(prepared, live);
    }

    /// Consumes the record for `prepared`, checking it against the current live entry count
    pub fn take(&mut self, prepared: usize, live_len: usize) -> LedgerMatch {
        match self.records.shift_remove(&prepared) {
            Some(live) if live < live_len => LedgerMatch::Replace(live),
            Some(live) => {
                warn!(live, live_len, prepared, "stale replace record, appending instead");
                LedgerMatch::Stale(live)
            }
            None => LedgerMatch::Append,
        }
    }

    /// Iterates over the outstanding (live, prepared) pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.records.iter().map(|(prepared, live)| (*live, *prepared))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
