//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity (course, chapter, slide) is shown by its semantic identity:
//! positional index or lesson id plus title. The source document is secondary
//! context on an indented `Source:` line.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Courses
//! 001 Stabilize (gateway 1, 2 chapters, 3 slides)
//!     Source: 010-stabilize.md
//!     Part 1: Foundations
//!         1.1 Welcome
//!         1.2 Breathing
//!
//! Failed
//!     090-broken.md: missing required field `gateway`
//!
//! 4 courses, 1 unpublished, 1 failed (5 parsed)
//! ```
//!
//! ## Progress
//!
//! ```text
//! Learner ana
//!     Days: 1-2 completed, 3 unlocked, 4-30 locked
//!     Completed: 2/30 (6.67%)
//!     Current day: 3
//!     Streak: 1 day (longest 1)
//!     Days in progress: 1
//!     Status: in_progress
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::catalog::CatalogBuild;
use crate::gating::{MarkOutcome, UnitState};
use crate::stats::{Enrollment, ProgressStats};
use crate::tracker::{EnrollOutcome, LessonOutcome};
use crate::types::{Chapter, ParsedCourse};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Course header: positional index, display title and shape.
///
/// ```text
/// 001 Stabilize (gateway 1, 2 chapters, 3 slides)
/// ```
fn course_header(index: usize, course: &ParsedCourse) -> String {
    format!(
        "{} {} (gateway {}, {}, {})",
        format_index(index),
        course.display_title,
        course.metadata.gateway,
        plural(course.total_chapters(), "chapter", "chapters"),
        plural(course.total_slides(), "slide", "slides"),
    )
}

fn chapter_label(chapter: &Chapter) -> String {
    if chapter.part > 0 {
        format!("Part {}: {}", chapter.part, chapter.title)
    } else {
        chapter.title.clone()
    }
}

/// Strip HTML tags from a string (simple angle-bracket stripping).
fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// First line of rendered HTML as plain text, cut to `max` characters.
fn preview(html: &str, max: usize) -> Option<String> {
    let text = strip_html_tags(html);
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    if line.chars().count() <= max {
        Some(line.to_string())
    } else {
        let cut: String = line.chars().take(max).collect();
        Some(format!("{cut}..."))
    }
}

/// Collapse consecutive equal states into ranges.
///
/// ```text
/// 1-2 completed, 3 unlocked, 4-30 locked
/// ```
fn state_ranges(states: &[UnitState]) -> String {
    let mut parts = Vec::new();
    let mut start = 0;
    while start < states.len() {
        let state = states[start];
        let end = states[start..]
            .iter()
            .position(|s| *s != state)
            .map(|n| start + n)
            .unwrap_or(states.len());
        let range = if end - start == 1 {
            format!("{}", start + 1)
        } else {
            format!("{}-{}", start + 1, end)
        };
        parts.push(format!("{range} {}", state.as_str()));
        start = end;
    }
    parts.join(", ")
}

// ============================================================================
// Scan
// ============================================================================

pub fn format_scan_output(build: &CatalogBuild) -> Vec<String> {
    let mut lines = vec!["Courses".to_string()];
    for (i, course) in build.catalog.get_all_courses().iter().enumerate() {
        lines.push(course_header(i + 1, course));
        if let Some((name, _)) = build.documents.iter().find(|(_, id)| id == course.id()) {
            lines.push(format!("{}Source: {name}", indent(1)));
        }
        for chapter in &course.chapters {
            lines.push(format!("{}{}", indent(1), chapter_label(chapter)));
            for slide in &chapter.slides {
                lines.push(format!("{}{} {}", indent(2), slide.id, slide.title));
            }
        }
    }

    if !build.failures.is_empty() {
        lines.push(String::new());
        lines.push("Failed".to_string());
        for failure in &build.failures {
            lines.push(format!("{}{}: {}", indent(1), failure.name, failure.error));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{}, {} unpublished, {} failed ({})",
        plural(build.catalog.len(), "course", "courses"),
        build.unpublished,
        build.failures.len(),
        build.cache_stats
    ));
    lines
}

pub fn print_scan_output(build: &CatalogBuild) {
    for line in format_scan_output(build) {
        println!("{line}");
    }
}

// ============================================================================
// Check
// ============================================================================

/// Parse failures and structural warnings, one document per block.
pub fn format_check_output(build: &CatalogBuild) -> Vec<String> {
    let mut lines = Vec::new();
    for failure in &build.failures {
        lines.push(format!("error: {}", failure.name));
        lines.push(format!("{}{}", indent(1), failure.error));
    }
    for (name, id) in &build.documents {
        let Some(course) = build.catalog.get_course_content(id) else {
            continue;
        };
        if course.warnings.is_empty() {
            continue;
        }
        lines.push(format!("warning: {name}"));
        for warning in &course.warnings {
            lines.push(format!("{}{warning}", indent(1)));
        }
    }
    let warnings: usize = build
        .catalog
        .get_all_courses()
        .iter()
        .map(|c| c.warnings.len())
        .sum();
    lines.push(format!(
        "{} ok, {} failed, {}",
        plural(build.documents.len(), "document", "documents"),
        build.failures.len(),
        plural(warnings, "warning", "warnings"),
    ));
    lines
}

pub fn print_check_output(build: &CatalogBuild) {
    for line in format_check_output(build) {
        println!("{line}");
    }
}

// ============================================================================
// Show
// ============================================================================

pub fn format_course(course: &ParsedCourse) -> Vec<String> {
    let meta = &course.metadata;
    let mut lines = vec![format!("{} [{}]", course.display_title, meta.id)];
    lines.push(format!("{}Gateway: {}", indent(1), meta.gateway));
    if let Some(instructor) = &meta.instructor {
        lines.push(format!("{}Instructor: {instructor}", indent(1)));
    }
    if let Some(duration) = &meta.duration {
        lines.push(format!("{}Duration: {duration}", indent(1)));
    }
    if let Some(difficulty) = meta.difficulty {
        lines.push(format!("{}Difficulty: {difficulty}", indent(1)));
    }
    if !meta.published {
        lines.push(format!("{}Unpublished", indent(1)));
    }
    if let Some(intro) = course.intro.as_deref().and_then(|i| preview(i, 60)) {
        lines.push(format!("{}Intro: {intro}", indent(1)));
    }

    for chapter in &course.chapters {
        lines.push(format!(
            "{} {}",
            format_index(chapter.order as usize),
            chapter_label(chapter)
        ));
        if let Some(summary) = chapter.summary.as_deref().and_then(|s| preview(s, 60)) {
            lines.push(format!("{}Summary: {summary}", indent(1)));
        }
        for slide in &chapter.slides {
            lines.push(format!("{}{} {}", indent(1), slide.id, slide.title));
            if let Some(text) = preview(&slide.content, 60) {
                lines.push(format!("{}{text}", indent(2)));
            }
        }
    }
    lines
}

pub fn print_course(course: &ParsedCourse) {
    for line in format_course(course) {
        println!("{line}");
    }
}

// ============================================================================
// Progress
// ============================================================================

pub fn format_progress(
    learner: &str,
    states: &[UnitState],
    stats: &ProgressStats,
    streak: u32,
    longest: u32,
) -> Vec<String> {
    vec![
        format!("Learner {learner}"),
        format!("{}Days: {}", indent(1), state_ranges(states)),
        format!(
            "{}Completed: {}/{} ({}%)",
            indent(1),
            stats.completed_days,
            stats.total_days,
            stats.completion_percentage
        ),
        format!("{}Current day: {}", indent(1), stats.current_day),
        format!(
            "{}Streak: {} (longest {longest})",
            indent(1),
            plural(streak as usize, "day", "days")
        ),
        format!("{}Days in progress: {}", indent(1), stats.days_in_progress),
        format!("{}Status: {}", indent(1), stats.status.as_str()),
    ]
}

pub fn print_progress(
    learner: &str,
    states: &[UnitState],
    stats: &ProgressStats,
    streak: u32,
    longest: u32,
) {
    for line in format_progress(learner, states, stats, streak, longest) {
        println!("{line}");
    }
}

pub fn format_mark_outcome(day: u32, outcome: &MarkOutcome) -> String {
    match outcome {
        MarkOutcome::Recorded(r) => {
            format!("Day {day} completed at {}", r.completed_at.to_rfc3339())
        }
        MarkOutcome::AlreadyCompleted(r) => format!(
            "Day {day} was already completed at {}",
            r.completed_at.to_rfc3339()
        ),
        MarkOutcome::Locked => format!("Day {day} is locked"),
    }
}

fn enrollment_line(e: &Enrollment) -> String {
    let mut line = format!(
        "{}: {}% ({} done)",
        e.course_id,
        e.progress,
        plural(e.lessons_completed.len(), "lesson", "lessons")
    );
    if e.completed_at.is_some() {
        line.push_str(", completed");
    }
    line
}

pub fn format_enroll_outcome(course_id: &str, outcome: &EnrollOutcome) -> String {
    match outcome {
        EnrollOutcome::Enrolled(e) => format!("Enrolled in {}", enrollment_line(e)),
        EnrollOutcome::AlreadyEnrolled(e) => format!("Already enrolled in {}", enrollment_line(e)),
        EnrollOutcome::Locked => format!("Course {course_id} is locked"),
        EnrollOutcome::UnknownCourse => format!("No course with id {course_id}"),
    }
}

pub fn format_lesson_outcome(course_id: &str, lesson_id: &str, outcome: &LessonOutcome) -> String {
    match outcome {
        LessonOutcome::Recorded {
            enrollment,
            course_completed: true,
        } => format!(
            "Lesson {lesson_id} completed, course finished: {}",
            enrollment_line(enrollment)
        ),
        LessonOutcome::Recorded { enrollment, .. } => {
            format!("Lesson {lesson_id} completed: {}", enrollment_line(enrollment))
        }
        LessonOutcome::AlreadyCompleted(e) => {
            format!("Lesson {lesson_id} was already completed: {}", enrollment_line(e))
        }
        LessonOutcome::NotEnrolled => format!("Not enrolled in {course_id}"),
        LessonOutcome::Locked => format!("Course {course_id} is locked"),
        LessonOutcome::UnknownCourse => format!("No course with id {course_id}"),
        LessonOutcome::UnknownLesson => format!("No lesson {lesson_id} in {course_id}"),
    }
}
