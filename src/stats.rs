//! Cadence and completion statistics.
//!
//! Calendar days are taken in a fixed UTC offset (the `[progress]
//! utc_offset_minutes` setting), so a completion at 23:30 local time counts
//! for that local day wherever the server runs.

use crate::gating::TOTAL_DAYS;
use crate::progress::{ProgressSnapshot, UnitKey};
use crate::types::ParsedCourse;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgramStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

/// Derived program summary. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressStats {
    pub completed_days: u32,
    pub total_days: u32,
    pub remaining_days: u32,
    /// First day without a record, or `total_days + 1` when all are done.
    pub current_day: u32,
    /// Percentage rounded to two decimals.
    pub completion_percentage: f64,
    pub days_in_progress: u32,
    pub status: ProgramStatus,
}

/// A learner's standing in one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrollment {
    pub course_id: String,
    pub enrolled_at: DateTime<Utc>,
    pub lessons_completed: BTreeSet<String>,
    /// Whole percent, 0–100.
    pub progress: u8,
    pub completed_at: Option<DateTime<Utc>>,
}

pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

fn completion_dates(snapshot: &ProgressSnapshot, offset: FixedOffset) -> BTreeSet<NaiveDate> {
    snapshot
        .day_records()
        .map(|r| local_date(r.completed_at, offset))
        .collect()
}

/// Consecutive calendar days with a completion, ending at the latest one.
///
/// The streak is broken (0) once a full calendar day has passed without a
/// completion, i.e. when the latest completion is older than yesterday.
pub fn calculate_streak(snapshot: &ProgressSnapshot, today: NaiveDate, offset: FixedOffset) -> u32 {
    let dates = completion_dates(snapshot, offset);
    let Some(&latest) = dates.last() else {
        return 0;
    };
    if (today - latest).num_days() > 1 {
        return 0;
    }
    let mut streak = 0;
    let mut day = Some(latest);
    while let Some(d) = day
        && dates.contains(&d)
    {
        streak += 1;
        day = d.pred_opt();
    }
    streak
}

/// Longest run of consecutive calendar days with a completion, ever.
pub fn longest_streak(snapshot: &ProgressSnapshot, offset: FixedOffset) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for date in completion_dates(snapshot, offset) {
        run = match previous {
            Some(p) if p.succ_opt() == Some(date) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }
    longest
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn get_progress_stats(
    snapshot: &ProgressSnapshot,
    today: NaiveDate,
    offset: FixedOffset,
) -> ProgressStats {
    let total_days = u32::from(TOTAL_DAYS);
    let completed_days = snapshot.day_records().count() as u32;
    let current_day = (1..=total_days)
        .find(|&day| snapshot.day_record(day).is_none())
        .unwrap_or(total_days + 1);

    let start = completion_dates(snapshot, offset)
        .first()
        .copied()
        .or_else(|| snapshot.program_started_at().map(|at| local_date(at, offset)));
    let days_in_progress = start
        .map(|s| ((today - s).num_days() + 1).max(0) as u32)
        .unwrap_or(0);

    let status = match completed_days {
        0 => ProgramStatus::NotStarted,
        n if n >= total_days => ProgramStatus::Completed,
        _ => ProgramStatus::InProgress,
    };

    ProgressStats {
        completed_days,
        total_days,
        remaining_days: total_days - completed_days,
        current_day,
        completion_percentage: round2(f64::from(completed_days) / f64::from(total_days) * 100.0),
        days_in_progress,
        status,
    }
}

/// Whole-percent progress, rounded half away from zero.
pub fn enrollment_progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (completed as f64 / total as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// The learner's enrollment in `course`, if they joined it.
///
/// Only lesson records matching a slide of the current course count, so
/// records left over from removed slides don't inflate progress.
pub fn enrollment(snapshot: &ProgressSnapshot, course: &ParsedCourse) -> Option<Enrollment> {
    let id = course.id();
    let enrolled = snapshot.get(&UnitKey::enrollment(id))?;
    let lessons_completed: BTreeSet<String> = course
        .slides()
        .filter(|s| snapshot.contains(&UnitKey::lesson(id, &s.id)))
        .map(|s| s.id.clone())
        .collect();
    Some(Enrollment {
        course_id: id.to_string(),
        enrolled_at: enrolled.completed_at,
        progress: enrollment_progress(lessons_completed.len(), course.total_slides()),
        lessons_completed,
        completed_at: snapshot
            .get(&UnitKey::course_completed(id))
            .map(|r| r.completed_at),
    })
}
