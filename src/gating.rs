//! Accessibility rules for program days and the course ladder.
//!
//! Every function here is a synchronous, pure computation over a
//! [`ProgressSnapshot`]. Persisting the result of [`mark_day_complete`] is the
//! caller's job (see [`ProgressTracker`](crate::tracker::ProgressTracker)).
//!
//! ## Unit State Machine
//!
//! ```text
//! Locked ──(previous unit completed)──► Unlocked ──(mark complete)──► Completed
//! ```
//!
//! Day 1 starts `Unlocked`, every other day `Locked`. `Completed` is terminal.
//! Courses follow the same shape one rung up: a course on gateway `g` unlocks
//! when the course on gateway `g - 1` has its completion record.

use crate::catalog::{Catalog, Prerequisite};
use crate::progress::{CompletionRecord, ProgressSnapshot, UnitKey};
use crate::types::ParsedCourse;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Length of the guided program.
pub const TOTAL_DAYS: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Locked,
    Unlocked,
    Completed,
}

impl UnitState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::Completed => "completed",
        }
    }
}

/// Result of trying to complete a day.
///
/// A gating violation is the `Locked` variant, not an error: the caller asked
/// for something the rules don't allow and nothing changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// A new record was written.
    Recorded(CompletionRecord),
    /// The day was already complete; its original record is kept.
    AlreadyCompleted(CompletionRecord),
    /// The day is out of range or its predecessor is not complete.
    Locked,
}

impl MarkOutcome {
    pub fn record(&self) -> Option<&CompletionRecord> {
        match self {
            Self::Recorded(r) | Self::AlreadyCompleted(r) => Some(r),
            Self::Locked => None,
        }
    }

    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

fn in_range(day: u32) -> bool {
    (1..=u32::from(TOTAL_DAYS)).contains(&day)
}

pub fn is_day_completed(snapshot: &ProgressSnapshot, day: u32) -> bool {
    in_range(day) && snapshot.day_record(day).is_some()
}

/// Day 1 is always open; day `n` opens once day `n - 1` is complete.
pub fn is_day_accessible(snapshot: &ProgressSnapshot, day: u32) -> bool {
    in_range(day) && (day == 1 || is_day_completed(snapshot, day - 1))
}

pub fn day_state(snapshot: &ProgressSnapshot, day: u32) -> UnitState {
    if is_day_completed(snapshot, day) {
        UnitState::Completed
    } else if is_day_accessible(snapshot, day) {
        UnitState::Unlocked
    } else {
        UnitState::Locked
    }
}

/// States of days `1..=TOTAL_DAYS`, in order.
pub fn day_states(snapshot: &ProgressSnapshot) -> Vec<UnitState> {
    (1..=u32::from(TOTAL_DAYS))
        .map(|day| day_state(snapshot, day))
        .collect()
}

/// Apply a day completion to the snapshot.
pub fn mark_day_complete(
    snapshot: &mut ProgressSnapshot,
    day: u32,
    now: DateTime<Utc>,
) -> MarkOutcome {
    if !is_day_accessible(snapshot, day) {
        return MarkOutcome::Locked;
    }
    if let Some(existing) = snapshot.day_record(day) {
        return MarkOutcome::AlreadyCompleted(CompletionRecord::at(existing.completed_at));
    }
    let Ok(day) = u8::try_from(day) else {
        return MarkOutcome::Locked;
    };
    let record = CompletionRecord::at(now);
    snapshot.insert(UnitKey::day(day), record);
    MarkOutcome::Recorded(record)
}

pub fn is_course_completed(snapshot: &ProgressSnapshot, course_id: &str) -> bool {
    snapshot.contains(&UnitKey::course_completed(course_id))
}

/// Gateway 1 is always open; gateway `g` opens once the course on gateway
/// `g - 1` is complete. An empty rung below keeps the course locked.
pub fn is_course_accessible(
    catalog: &Catalog,
    snapshot: &ProgressSnapshot,
    course: &ParsedCourse,
) -> bool {
    match catalog.prerequisite(course) {
        Prerequisite::None => true,
        Prerequisite::Course(prerequisite) => is_course_completed(snapshot, prerequisite.id()),
        Prerequisite::Missing { .. } => false,
    }
}

pub fn course_state(
    catalog: &Catalog,
    snapshot: &ProgressSnapshot,
    course: &ParsedCourse,
) -> UnitState {
    if is_course_completed(snapshot, course.id()) {
        UnitState::Completed
    } else if is_course_accessible(catalog, snapshot, course) {
        UnitState::Unlocked
    } else {
        UnitState::Locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogOptions;
    use crate::parser::parse_document;
    use crate::test_helpers::{at, document};

    fn completed_through(last: u8) -> ProgressSnapshot {
        ProgressSnapshot::from_records(
            "ana",
            (1..=last).map(|d| {
                (
                    UnitKey::day(d),
                    CompletionRecord::at(at(2026, 3, u32::from(d), 9)),
                )
            }),
        )
    }

    fn course(id: &str, gateway: u8) -> ParsedCourse {
        let front = format!("id: {id}\ntitle: {id}\ngateway: {gateway}");
        parse_document(&document(&front, "## C\n### S\nx")).unwrap()
    }

    fn catalog_of(courses: &[(&str, u8)]) -> Catalog {
        let courses = courses.iter().map(|&(id, g)| course(id, g)).collect();
        Catalog::from_courses(courses, CatalogOptions::default())
    }

    fn ladder() -> Catalog {
        catalog_of(&[("pr1", 1), ("pr2", 2), ("pr3", 3)])
    }

    fn finished(ids: &[&str]) -> ProgressSnapshot {
        let r = CompletionRecord::at(at(2026, 3, 1, 9));
        ProgressSnapshot::from_records(
            "ana",
            ids.iter().flat_map(|id| {
                [
                    (UnitKey::enrollment(*id), r),
                    (UnitKey::course_completed(*id), r),
                ]
            }),
        )
    }

    // =========================================================================
    // Day accessibility
    // =========================================================================

    #[test]
    fn fresh_learner_only_day_one_open() {
        let snapshot = ProgressSnapshot::empty("ana");
        assert!(is_day_accessible(&snapshot, 1));
        for day in 2..=30 {
            assert!(!is_day_accessible(&snapshot, day), "day {day}");
        }
    }

    #[test]
    fn accessible_iff_previous_completed() {
        for last in [0u8, 1, 7, 29, 30] {
            let snapshot = completed_through(last);
            for day in 2..=30u32 {
                assert_eq!(
                    is_day_accessible(&snapshot, day),
                    is_day_completed(&snapshot, day - 1),
                    "last={last} day={day}"
                );
            }
        }
    }

    #[test]
    fn out_of_range_is_never_accessible() {
        let snapshot = completed_through(30);
        assert!(!is_day_accessible(&snapshot, 0));
        assert!(!is_day_accessible(&snapshot, 31));
        assert!(!is_day_accessible(&snapshot, u32::MAX));
        assert_eq!(day_state(&snapshot, 31), UnitState::Locked);
    }

    #[test]
    fn states_follow_the_machine() {
        let states = day_states(&completed_through(2));
        assert_eq!(states.len(), 30);
        assert_eq!(&states[..4], &[
            UnitState::Completed,
            UnitState::Completed,
            UnitState::Unlocked,
            UnitState::Locked
        ]);
    }

    // =========================================================================
    // Marking days
    // =========================================================================

    #[test]
    fn mark_locked_day_changes_nothing() {
        let mut snapshot = completed_through(1);
        let before = snapshot.clone();
        assert_eq!(
            mark_day_complete(&mut snapshot, 3, at(2026, 3, 3, 9)),
            MarkOutcome::Locked
        );
        assert_eq!(
            mark_day_complete(&mut snapshot, 31, at(2026, 3, 3, 9)),
            MarkOutcome::Locked
        );
        assert_eq!(snapshot, before);
    }

    #[test]
    fn mark_twice_keeps_first_timestamp() {
        let mut snapshot = ProgressSnapshot::empty("ana");
        let first = at(2026, 3, 1, 9);
        assert!(mark_day_complete(&mut snapshot, 1, first).is_recorded());
        let again = mark_day_complete(&mut snapshot, 1, at(2026, 3, 2, 9));
        assert_eq!(
            again,
            MarkOutcome::AlreadyCompleted(CompletionRecord::at(first))
        );
        assert_eq!(snapshot.day_records().count(), 1);
    }

    #[test]
    fn completing_a_day_unlocks_the_next() {
        let mut snapshot = ProgressSnapshot::empty("ana");
        assert_eq!(day_state(&snapshot, 2), UnitState::Locked);
        mark_day_complete(&mut snapshot, 1, at(2026, 3, 1, 9));
        assert_eq!(day_state(&snapshot, 1), UnitState::Completed);
        assert_eq!(day_state(&snapshot, 2), UnitState::Unlocked);
    }

    // =========================================================================
    // Course ladder
    // =========================================================================

    #[test]
    fn first_gateway_is_open() {
        let catalog = ladder();
        let snapshot = ProgressSnapshot::empty("ana");
        let pr1 = catalog.get_course_content("pr1").unwrap();
        assert!(is_course_accessible(&catalog, &snapshot, pr1));
    }

    #[test]
    fn next_gateway_waits_for_completion() {
        let catalog = ladder();
        let pr2 = catalog.get_course_content("pr2").unwrap();
        let r = CompletionRecord::at(at(2026, 3, 1, 9));

        // Enrolled in pr1 only.
        let enrolled = ProgressSnapshot::from_records("ana", [(UnitKey::enrollment("pr1"), r)]);
        assert!(!is_course_accessible(&catalog, &enrolled, pr2));
        assert_eq!(course_state(&catalog, &enrolled, pr2), UnitState::Locked);

        let finished = ProgressSnapshot::from_records(
            "ana",
            [
                (UnitKey::enrollment("pr1"), r),
                (UnitKey::course_completed("pr1"), r),
            ],
        );
        assert!(is_course_accessible(&catalog, &finished, pr2));
        let pr1 = catalog.get_course_content("pr1").unwrap();
        assert_eq!(course_state(&catalog, &finished, pr1), UnitState::Completed);
        let pr3 = catalog.get_course_content("pr3").unwrap();
        assert_eq!(course_state(&catalog, &finished, pr3), UnitState::Locked);
    }

    #[test]
    fn lone_second_gateway_stays_locked() {
        let catalog = catalog_of(&[("pr2", 2)]);
        let pr2 = catalog.get_course_content("pr2").unwrap();
        let fresh = ProgressSnapshot::empty("ana");
        assert!(!is_course_accessible(&catalog, &fresh, pr2));
        assert_eq!(course_state(&catalog, &fresh, pr2), UnitState::Locked);
    }

    #[test]
    fn skipped_gateway_blocks_the_next() {
        let catalog = catalog_of(&[("pr1", 1), ("pr3", 3)]);
        let pr3 = catalog.get_course_content("pr3").unwrap();
        assert!(!is_course_accessible(&catalog, &finished(&["pr1"]), pr3));
    }

    #[test]
    fn ladder_opens_one_rung_at_a_time() {
        let catalog = ladder();
        let pr3 = catalog.get_course_content("pr3").unwrap();
        assert!(!is_course_accessible(&catalog, &finished(&["pr1"]), pr3));
        assert!(is_course_accessible(&catalog, &finished(&["pr1", "pr2"]), pr3));
    }
}
