//! Store trait shared by the file and in-memory backends

use log::warn;

use super::StoreError;
use crate::models::{Record, StoredEntry};
use crate::records::{assign_entry_ids, dedupe_mask, Dedupe};

/// Outcome of saving a batch of incoming entries
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaveResult {
    /// Incoming records with identifiers assigned, before deduplication
    pub assigned: Vec<Record>,
    /// Incoming records that were actually written
    pub saved: Vec<Record>,
    /// Incoming records dropped by deduplication
    pub dropped: usize,
    /// Previously stored records dropped by deduplication
    pub pruned: usize,
    /// Number of entries in the store after the save
    pub total: usize,
}

/// Core trait for record store backends
///
/// Backends only implement reading and writing the whole entry list;
/// identifier assignment and appending are shared default methods.
pub trait CaseStore: Send + Sync {
    /// Human-readable location, used in messages
    fn location(&self) -> String;

    /// Reads every stored entry, including non-object values.
    /// `Ok(None)` means nothing has been stored yet.
    fn try_load_entries(&self) -> Result<Option<Vec<StoredEntry>>, StoreError>;

    /// Replaces the stored entries
    fn persist_entries(&self, entries: &[StoredEntry]) -> Result<(), StoreError>;

    /// Reads the stored records, skipping non-object entries
    fn try_load(&self) -> Result<Option<Vec<Record>>, StoreError> {
        Ok(self
            .try_load_entries()?
            .map(|entries| entries.into_iter().filter_map(StoredEntry::into_record).collect()))
    }

    /// Replaces the stored document with `records`
    fn persist(&self, records: &[Record]) -> Result<(), StoreError> {
        let entries: Vec<StoredEntry> = records.iter().cloned().map(StoredEntry::from).collect();
        self.persist_entries(&entries)
    }

    /// Forgiving read: a missing or unreadable store is treated as empty
    fn load_entries(&self) -> Vec<StoredEntry> {
        match self.try_load_entries() {
            Ok(Some(entries)) => entries,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Treating {} as empty: {}", self.location(), e);
                Vec::new()
            }
        }
    }

    /// Forgiving read of the stored records
    fn load(&self) -> Vec<Record> {
        self.load_entries()
            .into_iter()
            .filter_map(StoredEntry::into_record)
            .collect()
    }

    /// Assigns identifiers to `incoming`, appends them and persists the
    /// combined list. Non-object entries already in the store are kept.
    ///
    /// This is a plain load-then-persist: two concurrent saves race and the
    /// last writer wins.
    fn save_incoming(&self, incoming: Vec<Record>, dedupe: Dedupe) -> Result<SaveResult, StoreError> {
        self.save_entries(incoming.into_iter().map(StoredEntry::from).collect(), dedupe)
    }

    /// [`CaseStore::save_incoming`] for entries that may include raw values
    fn save_entries(
        &self,
        incoming: Vec<StoredEntry>,
        dedupe: Dedupe,
    ) -> Result<SaveResult, StoreError> {
        let existing = self.load_entries();
        let before = existing.len();

        let incoming = assign_entry_ids(&existing, incoming);
        let combined: Vec<StoredEntry> = existing.into_iter().chain(incoming).collect();
        let keep = dedupe_mask(&combined, dedupe);

        let mut result = SaveResult::default();
        let mut kept = Vec::with_capacity(combined.len());
        for (index, (entry, survives)) in combined.into_iter().zip(keep).enumerate() {
            let is_incoming = index >= before;
            match (entry.as_record(), survives) {
                (Some(record), true) if is_incoming => {
                    result.assigned.push(record.clone());
                    result.saved.push(record.clone());
                }
                (Some(record), false) if is_incoming => {
                    result.assigned.push(record.clone());
                    result.dropped += 1;
                }
                (_, false) => result.pruned += 1,
                _ => {}
            }
            if survives {
                kept.push(entry);
            }
        }

        self.persist_entries(&kept)?;
        result.total = kept.len();
        Ok(result)
    }
}
