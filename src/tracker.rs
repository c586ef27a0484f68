//! Async façade over a progress store.
//!
//! [`ProgressTracker`] is what presentation code calls. Each operation loads
//! a fresh [`ProgressSnapshot`], runs the pure rules from [`gating`] and
//! [`stats`], and writes back whatever new records the rules produced.
//!
//! Store failures are returned unchanged as [`PersistenceError`]. Nothing is
//! retried. Outcomes the rules refuse (a locked day, a lesson in a locked
//! course) come back as enum variants, never as errors.
//!
//! ## Concurrency
//!
//! One active writer per learner is assumed. Two sessions racing on the same
//! unit both see the store's `AlreadyExists` on the loser, which is mapped
//! back to an "already completed" outcome carrying the winning record.

use crate::catalog::Catalog;
use crate::gating::{self, MarkOutcome, UnitState};
use crate::progress::{CompletionRecord, PersistenceError, ProgressSnapshot, ProgressStore, UnitKey};
use crate::stats::{self, Enrollment, ProgressStats};
use crate::types::ParsedCourse;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollOutcome {
    Enrolled(Enrollment),
    AlreadyEnrolled(Enrollment),
    /// The course's prerequisite is not complete.
    Locked,
    UnknownCourse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonOutcome {
    Recorded {
        enrollment: Enrollment,
        /// This lesson finished the course.
        course_completed: bool,
    },
    AlreadyCompleted(Enrollment),
    NotEnrolled,
    Locked,
    UnknownCourse,
    UnknownLesson,
}

/// Progress operations for every learner of one store.
pub struct ProgressTracker<S, C = SystemClock> {
    store: S,
    clock: C,
    offset: FixedOffset,
}

impl<S: ProgressStore> ProgressTracker<S, SystemClock> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: ProgressStore, C: Clock> ProgressTracker<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            offset: Utc.fix(),
        }
    }

    /// Offset that defines calendar-day boundaries for streaks and stats.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Today's date in the configured offset.
    pub fn today(&self) -> NaiveDate {
        stats::local_date(self.clock.now(), self.offset)
    }

    /// Program days and program start for `learner`.
    pub async fn snapshot(&self, learner: &str) -> Result<ProgressSnapshot, PersistenceError> {
        ProgressSnapshot::load_program(&self.store, learner).await
    }

    async fn course_snapshot(
        &self,
        learner: &str,
        catalog: &Catalog,
        course: &ParsedCourse,
    ) -> Result<ProgressSnapshot, PersistenceError> {
        let mut snapshot = ProgressSnapshot::empty(learner);
        snapshot.load_course(&self.store, course).await?;
        if let Some(prerequisite) = catalog.prerequisite(course).course() {
            snapshot.load_course(&self.store, prerequisite).await?;
        }
        Ok(snapshot)
    }

    /// Write a record unless someone got there first.
    ///
    /// Returns the record that ended up stored and whether it is ours.
    async fn write_once(
        &self,
        learner: &str,
        key: &UnitKey,
        record: CompletionRecord,
    ) -> Result<(CompletionRecord, bool), PersistenceError> {
        match self.store.set(learner, key, record).await {
            Ok(()) => Ok((record, true)),
            Err(PersistenceError::AlreadyExists { .. }) => {
                let existing = self.store.get(learner, key).await?.unwrap_or(record);
                debug!(learner, key = %key, "record already written by another session");
                Ok((existing, false))
            }
            Err(e) => Err(e),
        }
    }

    // ---------------------------------------------------------------------
    // Program days
    // ---------------------------------------------------------------------

    pub async fn is_day_accessible(
        &self,
        learner: &str,
        day: u32,
    ) -> Result<bool, PersistenceError> {
        Ok(gating::is_day_accessible(&self.snapshot(learner).await?, day))
    }

    pub async fn is_day_completed(
        &self,
        learner: &str,
        day: u32,
    ) -> Result<bool, PersistenceError> {
        Ok(gating::is_day_completed(&self.snapshot(learner).await?, day))
    }

    pub async fn day_state(&self, learner: &str, day: u32) -> Result<UnitState, PersistenceError> {
        Ok(gating::day_state(&self.snapshot(learner).await?, day))
    }

    /// Record the program start, once. Returns the stored start record.
    pub async fn start_program(&self, learner: &str) -> Result<CompletionRecord, PersistenceError> {
        let key = UnitKey::program_start();
        if let Some(existing) = self.store.get(learner, &key).await? {
            return Ok(existing);
        }
        let (record, fresh) = self
            .write_once(learner, &key, CompletionRecord::at(self.clock.now()))
            .await?;
        if fresh {
            info!(learner, "program started");
        }
        Ok(record)
    }

    pub async fn mark_day_complete(
        &self,
        learner: &str,
        day: u32,
    ) -> Result<MarkOutcome, PersistenceError> {
        let mut snapshot = self.snapshot(learner).await?;
        let outcome = gating::mark_day_complete(&mut snapshot, day, self.clock.now());
        let MarkOutcome::Recorded(record) = outcome else {
            debug!(learner, day, ?outcome, "day completion not recorded");
            return Ok(outcome);
        };
        let Ok(day_number) = u8::try_from(day) else {
            return Ok(MarkOutcome::Locked);
        };
        let (stored, fresh) = self
            .write_once(learner, &UnitKey::day(day_number), record)
            .await?;
        if !fresh {
            return Ok(MarkOutcome::AlreadyCompleted(stored));
        }
        info!(learner, day, completed_at = %stored.completed_at, "day completed");
        Ok(MarkOutcome::Recorded(stored))
    }

    /// The day a learner works on next, if the program isn't finished.
    pub async fn next_unlock_day(&self, learner: &str) -> Result<Option<u32>, PersistenceError> {
        let stats = self.get_progress_stats(learner).await?;
        Ok((stats.current_day <= stats.total_days).then_some(stats.current_day))
    }

    pub async fn calculate_streak(&self, learner: &str) -> Result<u32, PersistenceError> {
        let snapshot = self.snapshot(learner).await?;
        Ok(stats::calculate_streak(&snapshot, self.today(), self.offset))
    }

    pub async fn longest_streak(&self, learner: &str) -> Result<u32, PersistenceError> {
        let snapshot = self.snapshot(learner).await?;
        Ok(stats::longest_streak(&snapshot, self.offset))
    }

    pub async fn get_progress_stats(
        &self,
        learner: &str,
    ) -> Result<ProgressStats, PersistenceError> {
        let snapshot = self.snapshot(learner).await?;
        Ok(stats::get_progress_stats(&snapshot, self.today(), self.offset))
    }

    // ---------------------------------------------------------------------
    // Course ladder
    // ---------------------------------------------------------------------

    /// `None` when the course id is not in the catalog.
    pub async fn is_course_accessible(
        &self,
        learner: &str,
        catalog: &Catalog,
        course_id: &str,
    ) -> Result<Option<bool>, PersistenceError> {
        let Some(course) = catalog.get_course_content(course_id) else {
            return Ok(None);
        };
        let snapshot = self.course_snapshot(learner, catalog, course).await?;
        Ok(Some(gating::is_course_accessible(catalog, &snapshot, course)))
    }

    pub async fn course_state(
        &self,
        learner: &str,
        catalog: &Catalog,
        course: &ParsedCourse,
    ) -> Result<UnitState, PersistenceError> {
        let snapshot = self.course_snapshot(learner, catalog, course).await?;
        Ok(gating::course_state(catalog, &snapshot, course))
    }

    pub async fn enrollment(
        &self,
        learner: &str,
        course: &ParsedCourse,
    ) -> Result<Option<Enrollment>, PersistenceError> {
        let mut snapshot = ProgressSnapshot::empty(learner);
        snapshot.load_course(&self.store, course).await?;
        Ok(stats::enrollment(&snapshot, course))
    }

    /// Join a course. Enrolling twice keeps the first enrollment date.
    pub async fn enroll(
        &self,
        learner: &str,
        catalog: &Catalog,
        course_id: &str,
    ) -> Result<EnrollOutcome, PersistenceError> {
        let Some(course) = catalog.get_course_content(course_id) else {
            return Ok(EnrollOutcome::UnknownCourse);
        };
        let mut snapshot = self.course_snapshot(learner, catalog, course).await?;
        if let Some(existing) = stats::enrollment(&snapshot, course) {
            return Ok(EnrollOutcome::AlreadyEnrolled(existing));
        }
        if !gating::is_course_accessible(catalog, &snapshot, course) {
            debug!(learner, course = course_id, "enrollment refused, course locked");
            return Ok(EnrollOutcome::Locked);
        }

        let key = UnitKey::enrollment(course_id);
        let (record, fresh) = self
            .write_once(learner, &key, CompletionRecord::at(self.clock.now()))
            .await?;
        snapshot.insert(key, record);
        let Some(enrollment) = stats::enrollment(&snapshot, course) else {
            return Ok(EnrollOutcome::Locked);
        };
        if fresh {
            info!(learner, course = course_id, "enrolled");
            Ok(EnrollOutcome::Enrolled(enrollment))
        } else {
            Ok(EnrollOutcome::AlreadyEnrolled(enrollment))
        }
    }

    /// Complete one lesson (slide) of an enrolled, unlocked course.
    ///
    /// Whenever every lesson is done but the course completion record is
    /// not, that record is written too, which unlocks the next gateway.
    /// Repeating a lesson therefore repairs a completion write that failed
    /// earlier.
    pub async fn complete_lesson(
        &self,
        learner: &str,
        catalog: &Catalog,
        course_id: &str,
        lesson_id: &str,
    ) -> Result<LessonOutcome, PersistenceError> {
        let Some(course) = catalog.get_course_content(course_id) else {
            return Ok(LessonOutcome::UnknownCourse);
        };
        if course.find_slide(lesson_id).is_none() {
            return Ok(LessonOutcome::UnknownLesson);
        }
        let mut snapshot = self.course_snapshot(learner, catalog, course).await?;
        if !gating::is_course_accessible(catalog, &snapshot, course) {
            return Ok(LessonOutcome::Locked);
        }
        let Some(enrollment) = stats::enrollment(&snapshot, course) else {
            return Ok(LessonOutcome::NotEnrolled);
        };

        let now = self.clock.now();
        let fresh = if enrollment.lessons_completed.contains(lesson_id) {
            false
        } else {
            let key = UnitKey::lesson(course_id, lesson_id);
            let (record, fresh) = self
                .write_once(learner, &key, CompletionRecord::at(now))
                .await?;
            snapshot.insert(key, record);
            fresh
        };
        let course_completed = self
            .finish_course(learner, course, &mut snapshot, now)
            .await?;

        let Some(enrollment) = stats::enrollment(&snapshot, course) else {
            return Ok(LessonOutcome::NotEnrolled);
        };
        if !fresh {
            return Ok(LessonOutcome::AlreadyCompleted(enrollment));
        }
        debug!(
            learner,
            course = course_id,
            lesson = lesson_id,
            progress = enrollment.progress,
            "lesson completed"
        );
        Ok(LessonOutcome::Recorded {
            enrollment,
            course_completed,
        })
    }

    /// Write the course completion record if all lessons are done and it is
    /// still missing. Returns whether this call wrote it.
    async fn finish_course(
        &self,
        learner: &str,
        course: &ParsedCourse,
        snapshot: &mut ProgressSnapshot,
        now: DateTime<Utc>,
    ) -> Result<bool, PersistenceError> {
        let pending = stats::enrollment(snapshot, course)
            .is_some_and(|e| e.progress == 100 && e.completed_at.is_none());
        if !pending {
            return Ok(false);
        }
        let key = UnitKey::course_completed(course.id());
        let (record, written) = self
            .write_once(learner, &key, CompletionRecord::at(now))
            .await?;
        snapshot.insert(key, record);
        if written {
            info!(learner, course = course.id(), "course completed");
        }
        Ok(written)
    }
}
