//! Collection Store: in-run accumulation and durable CSV persistence.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::record::{IdentityKey, LaunchRecord, COLUMNS};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is not a launch table: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        StoreError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Records keyed by identity, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<LaunchRecord>,
    keys: HashSet<IdentityKey>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `record` unless its identity is already present. Returns whether it was added.
    pub fn insert(&mut self, record: LaunchRecord) -> bool {
        if self.keys.insert(record.identity_key()) {
            self.records.push(record);
            true
        } else {
            false
        }
    }

    /// Inserts every record, returning how many were new.
    pub fn extend<I: IntoIterator<Item = LaunchRecord>>(&mut self, records: I) -> usize {
        let mut added = 0;
        for record in records {
            if self.insert(record) {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[LaunchRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<LaunchRecord> {
        self.records
    }
}

impl FromIterator<LaunchRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = LaunchRecord>>(iter: I) -> Self {
        let mut set = RecordSet::new();
        set.extend(iter);
        set
    }
}

/// Result of merging new records into an existing table.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub records: Vec<LaunchRecord>,
    /// Distinct rows carried over from the existing table.
    pub existing: usize,
    pub added: usize,
    /// New records whose identity was already present.
    pub skipped: usize,
}

/// Existing rows first (first occurrence wins), then records with unseen identities.
pub fn merge(existing: Vec<LaunchRecord>, new: Vec<LaunchRecord>) -> MergeOutcome {
    let mut set: RecordSet = existing.into_iter().collect();
    let carried = set.len();
    let offered = new.len();
    let added = set.extend(new);
    MergeOutcome {
        records: set.into_records(),
        existing: carried,
        added,
        skipped: offered - added,
    }
}

/// A CSV table on disk.
#[derive(Debug, Clone)]
pub struct CollectionStore {
    path: PathBuf,
}

impl CollectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the table. A missing or zero-length file is an empty table.
    pub fn load_strict(&self) -> Result<Vec<LaunchRecord>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader
            .headers()
            .map_err(|e| StoreError::csv(&self.path, e))?
            .clone();
        if !headers
            .iter()
            .any(|h| h == "Product Name" || h == "Product URL")
        {
            return Err(StoreError::Corrupt {
                path: self.path.clone(),
                reason: "missing Product Name and Product URL columns".to_string(),
            });
        }
        reader
            .deserialize::<LaunchRecord>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::csv(&self.path, e))
    }

    /// Reads the table, treating an unreadable one as empty after copying it
    /// aside to `<name>.corrupt`.
    pub fn load_lenient(&self) -> Vec<LaunchRecord> {
        match self.load_strict() {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Existing table unreadable, starting fresh: {}", e);
                let backup = self.corrupt_path();
                match fs::copy(&self.path, &backup) {
                    Ok(_) => tracing::warn!("Copied unreadable table to {}", backup.display()),
                    Err(copy_err) => {
                        tracing::warn!("Could not back up unreadable table: {}", copy_err)
                    }
                }
                Vec::new()
            }
        }
    }

    /// Writes `records` atomically, replacing the table.
    pub fn save(&self, records: &[LaunchRecord]) -> Result<(), StoreError> {
        write_atomic(&self.path, |file| {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file);
            writer
                .write_record(COLUMNS)
                .map_err(|e| StoreError::csv(&self.path, e))?;
            for record in records {
                writer
                    .write_record(record.to_row())
                    .map_err(|e| StoreError::csv(&self.path, e))?;
            }
            writer.flush().map_err(|e| StoreError::io(&self.path, e))
        })
    }

    /// Loads the table (leniently), merges `new` into it and writes the result.
    pub fn merge_and_save(&self, new: Vec<LaunchRecord>) -> Result<MergeOutcome, StoreError> {
        let existing = self.load_lenient();
        let first_run = existing.is_empty();
        let outcome = merge(existing, new);
        self.save(&outcome.records)?;
        tracing::info!(
            path = %self.path.display(),
            first_run,
            existing = outcome.existing,
            added = outcome.added,
            skipped = outcome.skipped,
            total = outcome.records.len(),
            "Table saved"
        );
        Ok(outcome)
    }

    fn corrupt_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".corrupt");
        self.path.with_file_name(name)
    }
}

/// Writes through a temp file in the destination directory, syncs it, then
/// renames it over `path`. If `write` fails the destination is untouched.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut File) -> Result<(), StoreError>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| StoreError::io(&dir, e))?;
    write(tmp.as_file_mut())?;
    tmp.as_file_mut()
        .flush()
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}
