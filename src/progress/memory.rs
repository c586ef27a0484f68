//! In-memory progress store.
//!
//! Used by tests and by embedders that keep progress elsewhere and hand the
//! engine a pre-filled store per request.

use super::store::{CompletionRecord, PersistenceError, ProgressStore, UnitKey};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

type LearnerRecords = BTreeMap<UnitKey, CompletionRecord>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    learners: RwLock<HashMap<String, LearnerRecords>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records of one learner, ordered by key.
    pub async fn records(&self, learner: &str) -> LearnerRecords {
        self.learners
            .read()
            .await
            .get(learner)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get(
        &self,
        learner: &str,
        key: &UnitKey,
    ) -> Result<Option<CompletionRecord>, PersistenceError> {
        Ok(self
            .learners
            .read()
            .await
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
        let mut learners = self.learners.write().await;
        let records = learners.entry(learner.to_string()).or_default();
        if records.contains_key(key) {
            return Err(PersistenceError::AlreadyExists {
                learner: learner.to_string(),
                key: key.clone(),
            });
        }
        records.insert(key.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::at;

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("ana", &UnitKey::day(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get() {
        let store = MemoryStore::new();
        let record = CompletionRecord::at(at(2026, 3, 1, 9));
        store.set("ana", &UnitKey::day(1), record).await.unwrap();
        assert_eq!(
            store.get("ana", &UnitKey::day(1)).await.unwrap(),
            Some(record)
        );
        assert_eq!(store.get("ben", &UnitKey::day(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_refuses_overwrite() {
        let store = MemoryStore::new();
        let first = CompletionRecord::at(at(2026, 3, 1, 9));
        store.set("ana", &UnitKey::day(1), first).await.unwrap();

        let second = CompletionRecord::at(at(2026, 3, 2, 9));
        let err = store.set("ana", &UnitKey::day(1), second).await.unwrap_err();
        assert!(matches!(err, PersistenceError::AlreadyExists { .. }));
        assert_eq!(
            store.get("ana", &UnitKey::day(1)).await.unwrap(),
            Some(first)
        );
    }

    #[tokio::test]
    async fn records_lists_one_learner() {
        let store = MemoryStore::new();
        let record = CompletionRecord::at(at(2026, 3, 1, 9));
        store.set("ana", &UnitKey::day(2), record).await.unwrap();
        store.set("ana", &UnitKey::day(1), record).await.unwrap();
        store.set("ben", &UnitKey::day(1), record).await.unwrap();

        let keys: Vec<UnitKey> = store.records("ana").await.into_keys().collect();
        assert_eq!(keys, vec![UnitKey::day(1), UnitKey::day(2)]);
    }
}
