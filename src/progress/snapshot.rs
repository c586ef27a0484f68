//! Point-in-time view of one learner's records.
//!
//! Gating and stats are pure functions over a [`ProgressSnapshot`]; only the
//! loaders here talk to a [`ProgressStore`]. A snapshot holds exactly the
//! keys that were asked for, so a missing key means "no record" only for
//! units that were loaded.

use super::store::{CompletionRecord, PersistenceError, ProgressStore, UnitKey};
use crate::gating::TOTAL_DAYS;
use crate::types::ParsedCourse;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// One completed program day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRecord {
    pub day: u8,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    learner: String,
    records: BTreeMap<UnitKey, CompletionRecord>,
}

impl ProgressSnapshot {
    pub fn empty(learner: impl Into<String>) -> Self {
        Self {
            learner: learner.into(),
            records: BTreeMap::new(),
        }
    }

    /// Build from raw records. When a key repeats, the first record wins.
    pub fn from_records(
        learner: impl Into<String>,
        records: impl IntoIterator<Item = (UnitKey, CompletionRecord)>,
    ) -> Self {
        let mut snapshot = Self::empty(learner);
        for (key, record) in records {
            snapshot.insert(key, record);
        }
        snapshot
    }

    /// Read the program days and the program start.
    pub async fn load_program<S: ProgressStore + ?Sized>(
        store: &S,
        learner: &str,
    ) -> Result<Self, PersistenceError> {
        let mut snapshot = Self::empty(learner);
        for day in 1..=TOTAL_DAYS {
            snapshot.fetch(store, UnitKey::day(day)).await?;
        }
        snapshot.fetch(store, UnitKey::program_start()).await?;
        Ok(snapshot)
    }

    /// Add one course's enrollment, completion and lesson records.
    pub async fn load_course<S: ProgressStore + ?Sized>(
        &mut self,
        store: &S,
        course: &ParsedCourse,
    ) -> Result<(), PersistenceError> {
        let id = course.id();
        self.fetch(store, UnitKey::enrollment(id)).await?;
        self.fetch(store, UnitKey::course_completed(id)).await?;
        for slide in course.slides() {
            self.fetch(store, UnitKey::lesson(id, &slide.id)).await?;
        }
        Ok(())
    }

    async fn fetch<S: ProgressStore + ?Sized>(
        &mut self,
        store: &S,
        key: UnitKey,
    ) -> Result<(), PersistenceError> {
        if let Some(record) = store.get(&self.learner, &key).await? {
            self.records.insert(key, record);
        }
        Ok(())
    }

    pub fn learner(&self) -> &str {
        &self.learner
    }

    pub fn get(&self, key: &UnitKey) -> Option<&CompletionRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &UnitKey) -> bool {
        self.records.contains_key(key)
    }

    /// Record a completion unless the key already has one.
    ///
    /// Returns `false` and keeps the existing record when the key is taken.
    pub fn insert(&mut self, key: UnitKey, record: CompletionRecord) -> bool {
        match self.records.entry(key) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    pub fn day_record(&self, day: u32) -> Option<DayRecord> {
        let day = u8::try_from(day).ok()?;
        self.records.get(&UnitKey::day(day)).map(|r| DayRecord {
            day,
            completed_at: r.completed_at,
        })
    }

    /// Completed program days, in day order.
    pub fn day_records(&self) -> impl Iterator<Item = DayRecord> + '_ {
        self.records.iter().filter_map(|(key, record)| match key {
            UnitKey::Day(day) if (1..=TOTAL_DAYS).contains(day) => Some(DayRecord {
                day: *day,
                completed_at: record.completed_at,
            }),
            _ => None,
        })
    }

    pub fn program_started_at(&self) -> Option<DateTime<Utc>> {
        self.get(&UnitKey::program_start())
            .map(|r| r.completed_at)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
