//! In-memory storage backend
//!
//! Holds records for the lifetime of the process. Used for trial runs that
//! should not touch the persisted document, and in tests.

use std::sync::{Mutex, MutexGuard};

use super::traits::CaseStore;
use super::{StoreError, MEMORY_LOCATION};
use crate::models::{Record, StoredEntry};

/// In-memory backend implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Option<Vec<StoredEntry>>>,
}

impl MemoryStore {
    /// Creates an empty store that has never been written
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            entries: Mutex::new(Some(records.into_iter().map(StoredEntry::from).collect())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Vec<StoredEntry>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CaseStore for MemoryStore {
    fn location(&self) -> String {
        MEMORY_LOCATION.to_string()
    }

    fn try_load_entries(&self) -> Result<Option<Vec<StoredEntry>>, StoreError> {
        Ok(self.lock().clone())
    }

    fn persist_entries(&self, entries: &[StoredEntry]) -> Result<(), StoreError> {
        *self.lock() = Some(entries.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Field;
    use crate::records::Dedupe;

    #[test]
    fn test_new_store_is_unwritten() {
        let store = MemoryStore::new();
        assert!(store.try_load().unwrap().is_none());
    }

    #[test]
    fn test_save_incoming_with_dedupe() {
        let store = MemoryStore::with_records(vec![Record::new()
            .with("Test Case ID", "TC_1")
            .with("ticketId", "GAME-1")]);

        let result = store
            .save_incoming(
                vec![
                    Record::new().with("ticketId", "GAME-1"),
                    Record::new().with("ticketId", "GAME-2"),
                ],
                Dedupe::ByKey,
            )
            .unwrap();

        // GAME-1 is numbered before it is dropped, so GAME-2 gets TC_3
        assert_eq!(result.assigned.len(), 2);
        assert_eq!(result.saved.len(), 1);
        assert_eq!(result.saved[0].field(Field::Id).as_deref(), Some("TC_3"));
        assert_eq!(result.dropped, 1);
        assert_eq!(result.pruned, 0);
        assert_eq!(result.total, 2);

        let stored = store.load();
        assert_eq!(stored[1].field(Field::Id).as_deref(), Some("TC_3"));
        assert_eq!(stored[1].field(Field::TicketId).as_deref(), Some("GAME-2"));
    }

    #[test]
    fn test_save_entries_counts_pruned_existing() {
        let store = MemoryStore::with_records(vec![
            Record::new().with("Test Case ID", "TC_1"),
            Record::new().with("Test Case ID", "TC_1"),
        ]);

        let result = store
            .save_entries(
                vec![StoredEntry::Raw(serde_json::json!("note")), Record::new().into()],
                Dedupe::ByKey,
            )
            .unwrap();

        assert_eq!(result.pruned, 1);
        assert_eq!(result.dropped, 0);
        assert_eq!(result.saved.len(), 1);
        assert_eq!(result.total, 3);

        let entries = store.load_entries();
        assert_eq!(entries[1], StoredEntry::Raw(serde_json::json!("note")));
        assert_eq!(store.load().len(), 2);
    }
}
