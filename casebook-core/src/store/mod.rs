//! Record store abstraction
//!
//! The store owns the canonical list of test-case records. Consumers receive
//! a [`CaseStore`] instead of touching the JSON document directly, so the
//! report and submission paths can be exercised against an in-memory store.

mod json_file;
mod memory;
mod traits;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::{CaseStore, SaveResult};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Store location that selects the in-memory backend
pub const MEMORY_LOCATION: &str = ":memory:";

/// Errors raised while reading or writing the record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected JSON shape: expected an object or an array, got {0}")]
    UnexpectedShape(String),

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Opens the store at `path`, or an empty in-memory store for `:memory:`
pub fn open_store(path: &Path) -> Box<dyn CaseStore> {
    if path.as_os_str() == MEMORY_LOCATION {
        Box::new(MemoryStore::new())
    } else {
        Box::new(JsonFileStore::new(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_store_selects_backend() {
        let memory = open_store(Path::new(MEMORY_LOCATION));
        assert_eq!(memory.location(), MEMORY_LOCATION);

        let file = open_store(Path::new("Reports/test_cases.json"));
        assert_eq!(file.location(), "Reports/test_cases.json");
    }
}
