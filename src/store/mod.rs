// Copyright 2026 qc-capture developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Persisted record and issue-type store
//!
//! Two independent JSON files under a data directory hold the full ordered
//! record list and the known issue-type labels. Both are read once at
//! startup and rewritten in full on every change (write-through), using
//! atomic temp-file-then-rename writes so a crash never leaves a
//! half-written store.
//!
//! Read failures are recovered locally: corrupt or absent data falls back
//! to an empty record list or the default issue-type labels, with a logged
//! warning and nothing surfaced to the operator.

use atomic_write_file::AtomicWriteFile;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::types::Record;

/// File holding the full ordered record list.
pub const RECORDS_FILE: &str = "records.json";

/// File holding the known issue-type labels.
pub const ISSUE_TYPES_FILE: &str = "issue_types.json";

/// Issue-type labels used when no stored list exists.
pub const DEFAULT_ISSUE_TYPES: [&str; 8] = [
    "Label_Mismatch",
    "Unreadable_Barcode",
    "Coverslip_Missing",
    "Block_Count_Error",
    "Slide_Broken",
    "Container_Leak",
    "Specimen_ID_Missing",
    "Other",
];

/// Errors that can occur while persisting store state.
///
/// Load-side problems never produce these; they degrade to defaults.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Data directory cannot be created or written to.
    #[error("Data directory not writable: {0}")]
    DataDirNotWritable(PathBuf),

    /// Atomic write operation failed.
    #[error("Failed to write {file}: {message}")]
    WriteFailed { file: String, message: String },

    /// Record index out of range for an edit or delete.
    #[error("No record at index {0}")]
    NoSuchRecord(usize),

    /// Serialization failed (should not happen for well-formed records).
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Generic I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write-through store over a data directory.
///
/// Holds the in-memory working copies of the record list (newest first) and
/// the issue-type labels; every mutation rewrites the affected file before
/// returning.
#[derive(Debug)]
pub struct RecordStore {
    data_dir: PathBuf,
    records: Vec<Record>,
    issue_types: Vec<String>,
}

impl RecordStore {
    /// Opens a store over the given data directory, creating it if needed
    /// and loading both files.
    ///
    /// Corrupt or absent files are not an error; they fall back to an empty
    /// record list and the default issue-type labels.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DataDirNotWritable` if the directory cannot be
    /// created or is read-only.
    pub fn open(data_dir: PathBuf) -> Result<Self, StoreError> {
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)
                .map_err(|_| StoreError::DataDirNotWritable(data_dir.clone()))?;
        }
        if data_dir.metadata()?.permissions().readonly() {
            return Err(StoreError::DataDirNotWritable(data_dir));
        }

        let records: Vec<Record> = load_or_default(&data_dir.join(RECORDS_FILE), Vec::new);
        let issue_types: Vec<String> = load_or_default(&data_dir.join(ISSUE_TYPES_FILE), || {
            DEFAULT_ISSUE_TYPES.iter().map(|s| s.to_string()).collect()
        });

        debug!(
            records = records.len(),
            issue_types = issue_types.len(),
            "store loaded from {}",
            data_dir.display()
        );

        Ok(Self {
            data_dir,
            records,
            issue_types,
        })
    }

    /// The record list, newest first.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The known issue-type labels.
    pub fn issue_types(&self) -> &[String] {
        &self.issue_types
    }

    /// Number of captured records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records have been captured.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Prepends a record (newest first) and persists the list.
    pub fn add_record(&mut self, record: Record) -> Result<(), StoreError> {
        self.records.insert(0, record);
        self.persist_records()
    }

    /// Sets the issue type of the record at `index` and persists.
    pub fn set_issue_type(&mut self, index: usize, issue_type: &str) -> Result<(), StoreError> {
        let record = self
            .records
            .get_mut(index)
            .ok_or(StoreError::NoSuchRecord(index))?;
        record.issue_type = issue_type.to_string();
        self.persist_records()
    }

    /// Sets the free-text notes of the record at `index` and persists.
    pub fn set_notes(&mut self, index: usize, notes: &str) -> Result<(), StoreError> {
        let record = self
            .records
            .get_mut(index)
            .ok_or(StoreError::NoSuchRecord(index))?;
        record.notes = notes.to_string();
        self.persist_records()
    }

    /// Removes and returns the record at `index`, persisting the list.
    pub fn delete_record(&mut self, index: usize) -> Result<Record, StoreError> {
        if index >= self.records.len() {
            return Err(StoreError::NoSuchRecord(index));
        }
        let record = self.records.remove(index);
        self.persist_records()?;
        Ok(record)
    }

    /// Removes every record and persists the empty list.
    ///
    /// Destructive; callers are responsible for operator confirmation.
    pub fn clear_records(&mut self) -> Result<(), StoreError> {
        self.records.clear();
        self.persist_records()
    }

    /// Adds an issue-type label if not already known, preserving order,
    /// and persists the list.
    pub fn add_issue_type(&mut self, label: &str) -> Result<(), StoreError> {
        let label = label.trim();
        if label.is_empty() || self.issue_types.iter().any(|t| t == label) {
            return Ok(());
        }
        self.issue_types.push(label.to_string());
        self.persist_issue_types()
    }

    fn persist_records(&self) -> Result<(), StoreError> {
        write_json(&self.data_dir.join(RECORDS_FILE), &self.records)
    }

    fn persist_issue_types(&self) -> Result<(), StoreError> {
        write_json(&self.data_dir.join(ISSUE_TYPES_FILE), &self.issue_types)
    }
}

/// Loads a JSON file, substituting a default on any failure.
///
/// Absent files are the normal first-run case and log at debug; corrupt
/// files log a warning. Neither is surfaced as an error.
fn load_or_default<T, F>(path: &Path, default: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                warn!("corrupt store file {}, using defaults: {}", path.display(), e);
                default()
            }
        },
        Err(e) => {
            debug!("store file {} not read ({}), using defaults", path.display(), e);
            default()
        }
    }
}

/// Serializes a value and writes it atomically (temp file + rename).
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;

    let mut file = AtomicWriteFile::options()
        .open(path)
        .map_err(|e| StoreError::WriteFailed {
            file: path.display().to_string(),
            message: format!("Failed to open for atomic write: {}", e),
        })?;

    file.write_all(json.as_bytes())
        .map_err(|e| StoreError::WriteFailed {
            file: path.display().to_string(),
            message: format!("Failed to write content: {}", e),
        })?;

    file.commit().map_err(|e| StoreError::WriteFailed {
        file: path.display().to_string(),
        message: format!("Failed to commit atomic write: {}", e),
    })?;

    Ok(())
}
