//! JSON-file progress store.
//!
//! Keeps every learner's records in one JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "learners": {
//!     "ana": {
//!       "day:1": { "completed_at": "2026-03-01T09:00:00Z" },
//!       "enroll:pr1": { "completed_at": "2026-03-01T09:05:00Z" }
//!     }
//!   }
//! }
//! ```
//!
//! The file is read once on [`JsonFileStore::open`] and rewritten after every
//! successful `set`, via a temporary file and a rename so readers never see
//! a half-written document. Writes from this process are serialized; writes
//! from several processes sharing one file are not coordinated.

use super::store::{CompletionRecord, PersistenceError, ProgressStore, UnitKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const FILE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ProgressFile {
    version: u32,
    #[serde(default)]
    learners: BTreeMap<String, BTreeMap<UnitKey, CompletionRecord>>,
}

impl Default for ProgressFile {
    fn default() -> Self {
        Self {
            version: FILE_VERSION,
            learners: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<ProgressFile>,
}

impl JsonFileStore {
    /// Open a store file, starting empty if it doesn't exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                let file: ProgressFile = serde_json::from_str(&text)?;
                if file.version != FILE_VERSION {
                    return Err(PersistenceError::Unavailable(format!(
                        "{} has unsupported version {}",
                        path.display(),
                        file.version
                    )));
                }
                file
            }
            Err(e) if e.kind() == ErrorKind::NotFound => ProgressFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records of one learner, ordered by key.
    pub async fn records(&self, learner: &str) -> BTreeMap<UnitKey, CompletionRecord> {
        self.state
            .lock()
            .await
            .learners
            .get(learner)
            .cloned()
            .unwrap_or_default()
    }

    async fn persist(&self, file: &ProgressFile) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(file)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for JsonFileStore {
    async fn get(
        &self,
        learner: &str,
        key: &UnitKey,
    ) -> Result<Option<CompletionRecord>, PersistenceError> {
        Ok(self
            .state
            .lock()
            .await
            .learners
            .get(learner)
            .and_then(|records| records.get(key))
            .copied())
    }

    async fn set(
        &self,
        learner: &str,
        key: &UnitKey,
        record: CompletionRecord,
    ) -> Result<(), PersistenceError> {
        let mut state = self.state.lock().await;
        let records = state.learners.entry(learner.to_string()).or_default();
        if records.contains_key(key) {
            return Err(PersistenceError::AlreadyExists {
                learner: learner.to_string(),
                key: key.clone(),
            });
        }
        records.insert(key.clone(), record);

        if let Err(e) = self.persist(&state).await {
            // Keep memory in step with disk.
            if let Some(records) = state.learners.get_mut(learner) {
                records.remove(key);
            }
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::at;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path().join("progress.json"))
            .await
            .unwrap();
        assert!(store.records("ana").await.is_empty());
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state/progress.json");
        let record = CompletionRecord::at(at(2026, 3, 1, 9));
        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.set("ana", &UnitKey::day(1), record).await.unwrap();
            store
                .set("ana", &UnitKey::lesson("pr1", "1.1"), record)
                .await
                .unwrap();
        }
        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("ana", &UnitKey::day(1)).await.unwrap(),
            Some(record)
        );
        assert_eq!(reopened.records("ana").await.len(), 2);
    }

    #[tokio::test]
    async fn file_uses_string_keys() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("progress.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .set("ana", &UnitKey::day(4), CompletionRecord::at(at(2026, 3, 4, 7)))
            .await
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["version"], 1);
        assert!(json["learners"]["ana"]["day:4"]["completed_at"].is_string());
        assert!(!tmp.path().join("progress.json.tmp").exists());
    }

    #[tokio::test]
    async fn set_refuses_overwrite() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path().join("p.json")).await.unwrap();
        let first = CompletionRecord::at(at(2026, 3, 1, 9));
        store.set("ana", &UnitKey::day(1), first).await.unwrap();
        let err = store
            .set("ana", &UnitKey::day(1), CompletionRecord::at(at(2026, 3, 9, 9)))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::AlreadyExists { .. }));
        assert_eq!(store.get("ana", &UnitKey::day(1)).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn corrupt_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("p.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(PersistenceError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn unknown_version_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("p.json");
        std::fs::write(&path, r#"{"version": 99, "learners": {}}"#).unwrap();
        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(PersistenceError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn failed_write_rolls_back_memory() {
        let tmp = TempDir::new().unwrap();
        // A directory in place of the file makes the rename fail.
        let path = tmp.path().join("taken");
        std::fs::create_dir_all(path.join("child")).unwrap();
        let store = JsonFileStore {
            path: path.clone(),
            state: Mutex::new(ProgressFile::default()),
        };
        let result = store
            .set("ana", &UnitKey::day(1), CompletionRecord::at(at(2026, 3, 1, 9)))
            .await;
        assert!(result.is_err());
        assert_eq!(store.get("ana", &UnitKey::day(1)).await.unwrap(), None);
    }
}
