//! Organization history
//!
//! Every folder organized by a signed-in user leaves one record: the file
//! names with their main category and the summary line. Records are listed
//! newest first and can be deleted or re-downloaded by id.

use crate::error::{Error, Result};
use crate::hash::new_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default history file name inside the data directory
pub const HISTORY_FILE: &str = "history.json";

/// A file as stored in history: its name and main category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
}

/// One stored organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub id: String,
    pub user_id: String,
    pub files: Vec<FileEntry>,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller when inserting a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub user_id: String,
    pub files: Vec<FileEntry>,
    pub summary: String,
}

/// Persistence for organization records
pub trait HistoryStore {
    /// Store a record, assigning its id and creation time
    fn insert(&mut self, record: NewRecord) -> Result<OrganizationRecord>;

    /// A user's records, newest first
    fn list(&self, user_id: &str) -> Result<Vec<OrganizationRecord>>;

    /// One of a user's records by id
    fn get(&self, user_id: &str, id: &str) -> Result<OrganizationRecord>;

    /// Remove one of a user's records by id
    fn delete(&mut self, user_id: &str, id: &str) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryFile {
    version: u32,
    records: Vec<OrganizationRecord>,
}

impl HistoryFile {
    const VERSION: u32 = 1;

    fn new() -> Self {
        Self {
            version: Self::VERSION,
            records: Vec::new(),
        }
    }
}

/// History kept in a JSON file, rewritten atomically on every change
#[derive(Debug)]
pub struct JsonHistoryStore {
    path: PathBuf,
    data: HistoryFile,
}

impl JsonHistoryStore {
    /// Open the store at `path`, starting empty when the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!(?path, "History file does not exist, starting empty");
            return Ok(Self {
                path,
                data: HistoryFile::new(),
            });
        }

        let file = File::open(&path)
            .map_err(|e| Error::History(format!("Failed to open history file: {}", e)))?;
        let data: HistoryFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::History(format!("Failed to parse history file: {}", e)))?;

        if data.version != HistoryFile::VERSION {
            return Err(Error::History(format!(
                "Unsupported history file version {} (expected {})",
                data.version,
                HistoryFile::VERSION
            )));
        }

        debug!(?path, records = data.records.len(), "Loaded history");
        Ok(Self { path, data })
    }

    /// Open `history.json` inside a data directory
    pub fn in_dir(data_dir: &Path) -> Result<Self> {
        Self::open(data_dir.join(HISTORY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let file = File::create(&temp_path)
            .map_err(|e| Error::History(format!("Failed to create temp history file: {}", e)))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.data)
            .map_err(|e| Error::History(format!("Failed to write history file: {}", e)))?;

        fs::rename(&temp_path, &self.path)
            .map_err(|e| Error::History(format!("Failed to rename temp history file: {}", e)))?;
        Ok(())
    }

    fn position(&self, user_id: &str, id: &str) -> Option<usize> {
        self.data
            .records
            .iter()
            .position(|r| r.id == id && r.user_id == user_id)
    }
}

impl HistoryStore for JsonHistoryStore {
    fn insert(&mut self, record: NewRecord) -> Result<OrganizationRecord> {
        let stored = OrganizationRecord {
            id: new_id(&["organization", &record.user_id, &record.summary]),
            user_id: record.user_id,
            files: record.files,
            summary: record.summary,
            created_at: Utc::now(),
        };

        self.data.records.push(stored.clone());
        if let Err(e) = self.save() {
            self.data.records.pop();
            return Err(e);
        }

        info!(id = %stored.id, files = stored.files.len(), "Saved organization to history");
        Ok(stored)
    }

    fn list(&self, user_id: &str) -> Result<Vec<OrganizationRecord>> {
        let mut records: Vec<_> = self
            .data
            .records
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn get(&self, user_id: &str, id: &str) -> Result<OrganizationRecord> {
        self.position(user_id, id)
            .map(|i| self.data.records[i].clone())
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))
    }

    fn delete(&mut self, user_id: &str, id: &str) -> Result<()> {
        let Some(index) = self.position(user_id, id) else {
            warn!(%id, "Tried to delete a record that does not exist");
            return Err(Error::RecordNotFound(id.to_string()));
        };

        let removed = self.data.records.remove(index);
        if let Err(e) = self.save() {
            self.data.records.insert(index, removed);
            return Err(e);
        }

        info!(%id, "Deleted organization from history");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(user: &str, summary: &str) -> NewRecord {
        NewRecord {
            user_id: user.to_string(),
            files: vec![FileEntry {
                name: "notes.txt".to_string(),
                file_type: "documents".to_string(),
            }],
            summary: summary.to_string(),
        }
    }

    #[test]
    fn test_insert_and_list_newest_first() {
        let dir = tempdir().unwrap();
        let mut store = JsonHistoryStore::in_dir(dir.path()).unwrap();

        let first = store.insert(record("u1", "first")).unwrap();
        let second = store.insert(record("u1", "second")).unwrap();
        store.insert(record("u2", "other user")).unwrap();

        let listed = store.list("u1").unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
        assert!(store.list("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let stored = {
            let mut store = JsonHistoryStore::in_dir(dir.path()).unwrap();
            store.insert(record("u1", "kept")).unwrap()
        };

        let store = JsonHistoryStore::in_dir(dir.path()).unwrap();
        assert_eq!(store.get("u1", &stored.id).unwrap(), stored);
        assert!(!dir.path().join("history.tmp").exists());
    }

    #[test]
    fn test_file_entry_serializes_type() {
        let json = serde_json::to_value(FileEntry {
            name: "a.jpg".into(),
            file_type: "images".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "images");
    }

    #[test]
    fn test_delete_is_scoped_to_owner() {
        let dir = tempdir().unwrap();
        let mut store = JsonHistoryStore::in_dir(dir.path()).unwrap();
        let stored = store.insert(record("u1", "mine")).unwrap();

        assert!(matches!(
            store.delete("u2", &stored.id),
            Err(Error::RecordNotFound(_))
        ));
        store.delete("u1", &stored.id).unwrap();
        assert!(matches!(
            store.get("u1", &stored.id),
            Err(Error::RecordNotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(HISTORY_FILE), "not json").unwrap();
        assert!(matches!(
            JsonHistoryStore::in_dir(dir.path()),
            Err(Error::History(_))
        ));
    }
}
