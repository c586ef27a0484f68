//! Progress store trait and shared record types.
//!
//! The [`ProgressStore`] trait is the only way the engine touches durable
//! learner state. Implementations may sit on a network or a disk, so both
//! operations are async; the gating and stats logic never calls them directly
//! and works on a [`ProgressSnapshot`](super::ProgressSnapshot) instead.
//!
//! ## Unit Keys
//!
//! Every completion is stored under a [`UnitKey`] with a stable string form:
//!
//! | Key | String form |
//! |-----|-------------|
//! | `Day(7)` | `day:7` |
//! | `ProgramStart` | `program-start` |
//! | `Enrollment { course_id: "pr1" }` | `enroll:pr1` |
//! | `Lesson { course_id: "pr1", lesson_id: "1.2" }` | `lesson:pr1:1.2` |
//! | `CourseCompleted { course_id: "pr1" }` | `course-complete:pr1` |
//!
//! ## Write Contract
//!
//! `set` must refuse to overwrite an existing record and return
//! [`PersistenceError::AlreadyExists`]. The tracker enforces first-write-wins
//! on its own as well, so a store that only approximates this is still safe
//! against everything but concurrent writers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Record {key} already exists for learner {learner}")]
    AlreadyExists { learner: String, key: UnitKey },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Progress data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Progress store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid unit key `{0}`")]
pub struct UnitKeyError(String);

/// A discrete unit a learner can complete.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UnitKey {
    /// A day of the guided program (1-based).
    Day(u8),
    /// The learner started the guided program.
    ProgramStart,
    /// The learner joined a course.
    Enrollment { course_id: String },
    /// One slide of a course, keyed by its lesson id.
    Lesson { course_id: String, lesson_id: String },
    /// Written once, when every lesson of the course is complete.
    CourseCompleted { course_id: String },
}

impl UnitKey {
    pub fn day(day: u8) -> Self {
        Self::Day(day)
    }

    pub fn enrollment(course_id: impl Into<String>) -> Self {
        Self::Enrollment {
            course_id: course_id.into(),
        }
    }

    pub fn lesson(course_id: impl Into<String>, lesson_id: impl Into<String>) -> Self {
        Self::Lesson {
            course_id: course_id.into(),
            lesson_id: lesson_id.into(),
        }
    }

    pub fn course_completed(course_id: impl Into<String>) -> Self {
        Self::CourseCompleted {
            course_id: course_id.into(),
        }
    }

    pub fn program_start() -> Self {
        Self::ProgramStart
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(day) => write!(f, "day:{day}"),
            Self::ProgramStart => f.write_str("program-start"),
            Self::Enrollment { course_id } => write!(f, "enroll:{course_id}"),
            Self::Lesson {
                course_id,
                lesson_id,
            } => write!(f, "lesson:{course_id}:{lesson_id}"),
            Self::CourseCompleted { course_id } => write!(f, "course-complete:{course_id}"),
        }
    }
}

impl FromStr for UnitKey {
    type Err = UnitKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || UnitKeyError(s.to_string());
        if s == "program-start" {
            return Ok(Self::ProgramStart);
        }
        let (kind, rest) = s.split_once(':').ok_or_else(invalid)?;
        if rest.is_empty() {
            return Err(invalid());
        }
        match kind {
            "day" => rest.parse::<u8>().map(Self::Day).map_err(|_| invalid()),
            "enroll" => Ok(Self::enrollment(rest)),
            "course-complete" => Ok(Self::course_completed(rest)),
            "lesson" => {
                // Lesson ids never contain ':', course ids might.
                let (course_id, lesson_id) = rest.rsplit_once(':').ok_or_else(invalid)?;
                if course_id.is_empty() || lesson_id.is_empty() {
                    return Err(invalid());
                }
                Ok(Self::lesson(course_id, lesson_id))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for UnitKey {
    type Error = UnitKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UnitKey> for String {
    fn from(key: UnitKey) -> Self {
        key.to_string()
    }
}

/// An append-once completion entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub completed_at: DateTime<Utc>,
}

impl CompletionRecord {
    pub fn at(completed_at: DateTime<Utc>) -> Self {
        Self { completed_at }
    }
}

/// Durable per-learner completion records.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Read one record.
    async fn get(
        &self,
        learner: &str,
        key: &UnitKey,
    ) -> Result<Option<CompletionRecord>, PersistenceError>;

    /// Write a record that does not exist yet.
    async fn set(
        &self,
        learner: &str,
        key: &UnitKey,
        record: CompletionRecord,
    ) -> Result<(), PersistenceError>;
}

#[async_trait]
impl<S: ProgressStore + ?Sized> ProgressStore for Arc<S> {
    async fn get(
        &self,
        learner: &str,
        key: &UnitKey,
    ) -> Result<Option<CompletionRecord>, PersistenceError> {
        (**self).get(learner, key).await
    }

    async fn set(
        &self,
        learner: &str,
        key: &UnitKey,
        record: CompletionRecord,
    ) -> Result<(), PersistenceError> {
        (**self).set(learner, key, record).await
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Store whose reads or writes always fail, for error-propagation tests.
    #[derive(Default)]
    pub struct FailingStore {
        pub fail_reads: bool,
        pub fail_writes: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl FailingStore {
        pub fn reads() -> Self {
            Self {
                fail_reads: true,
                ..Self::default()
            }
        }

        pub fn writes() -> Self {
            Self {
                fail_writes: true,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProgressStore for FailingStore {
        async fn get(
            &self,
            _learner: &str,
            key: &UnitKey,
        ) -> Result<Option<CompletionRecord>, PersistenceError> {
            self.calls.lock().unwrap().push(format!("get {key}"));
            if self.fail_reads {
                return Err(PersistenceError::Unavailable("read refused".into()));
            }
            Ok(None)
        }

        async fn set(
            &self,
            _learner: &str,
            key: &UnitKey,
            _record: CompletionRecord,
        ) -> Result<(), PersistenceError> {
            self.calls.lock().unwrap().push(format!("set {key}"));
            if self.fail_writes {
                return Err(PersistenceError::Unavailable("write refused".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn key_string_forms() {
        assert_eq!(UnitKey::day(7).to_string(), "day:7");
        assert_eq!(UnitKey::program_start().to_string(), "program-start");
        assert_eq!(UnitKey::enrollment("pr1").to_string(), "enroll:pr1");
        assert_eq!(UnitKey::lesson("pr1", "1.2").to_string(), "lesson:pr1:1.2");
        assert_eq!(
            UnitKey::course_completed("pr1").to_string(),
            "course-complete:pr1"
        );
    }

    #[test]
    fn key_parse_inverts_display() {
        for key in [
            UnitKey::day(30),
            UnitKey::program_start(),
            UnitKey::lesson("ns:course", "3.4"),
            UnitKey::course_completed("pr5"),
        ] {
            assert_eq!(key.to_string().parse::<UnitKey>(), Ok(key));
        }
    }

    #[test]
    fn bad_keys_rejected() {
        for bad in ["", "day", "program-start:x", "day:", "day:x", "day:300", "lesson:pr1", "week:1", "enroll:"] {
            assert!(bad.parse::<UnitKey>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn program_start_is_not_a_course_enrollment() {
        assert_ne!(UnitKey::program_start(), UnitKey::enrollment("program"));
        assert_ne!(
            UnitKey::program_start().to_string(),
            UnitKey::enrollment("program").to_string()
        );
        assert_eq!(
            "enroll:program".parse::<UnitKey>(),
            Ok(UnitKey::enrollment("program"))
        );
    }

    #[test]
    fn key_serializes_as_string() {
        let json = serde_json::to_string(&UnitKey::day(3)).unwrap();
        assert_eq!(json, "\"day:3\"");
        let back: UnitKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UnitKey::day(3));
    }
}
