//! JSON document storage backend
//!
//! All records live in a single JSON document. The document may hold either
//! one object (a single record) or an array; array elements that are not
//! objects are carried through untouched. Writes go to a
//! temporary file in the same directory which is then renamed over the
//! target, so readers never see a half-written document.

use log::debug;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::traits::CaseStore;
use super::StoreError;
use crate::models::StoredEntry;
use crate::records::normalize_entries;

/// JSON file backend implementation
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a new store for the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the path to the storage file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the temporary file is created in
    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Parses a stored document
    pub fn decode(&self, content: &str) -> Result<Vec<StoredEntry>, StoreError> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        normalize_entries(value)
    }

    /// Writes `entries` as a pretty-printed document and flushes `writer`.
    ///
    /// I/O failures surface as [`StoreError::Write`], whether they come from
    /// the serializer or from the flush.
    fn write_document<W: Write>(&self, mut writer: W, entries: &[StoredEntry]) -> Result<(), StoreError> {
        let write_err = |source: std::io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        serde_json::to_writer_pretty(&mut writer, entries).map_err(|e| {
            if e.is_io() {
                write_err(e.into())
            } else {
                StoreError::Serialize(e)
            }
        })?;
        writer.flush().map_err(write_err)
    }
}

impl CaseStore for JsonFileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn try_load_entries(&self) -> Result<Option<Vec<StoredEntry>>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let entries = self.decode(&content)?;
        debug!("Loaded {} entries from {:?}", entries.len(), self.path);
        Ok(Some(entries))
    }

    fn persist_entries(&self, entries: &[StoredEntry]) -> Result<(), StoreError> {
        let write_err = |source: std::io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = self.parent_dir();
        fs::create_dir_all(&dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        self.write_document(BufWriter::new(tmp.as_file_mut()), entries)?;
        tmp.as_file_mut().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!("Persisted {} entries to {:?}", entries.len(), self.path);
        Ok(())
    }
}
