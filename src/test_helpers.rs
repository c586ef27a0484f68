//! Shared test utilities for the course-unlock test suite.
//!
//! Provides document builders, lookup helpers, bulk extractors, and a course
//! shape assertion that work with catalog data structures (`Catalog`,
//! `ParsedCourse`, `Chapter`), plus fixed timestamps for progress tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let source = FsDocumentSource::new(tmp.path(), &["md".to_string()]);
//! let build = build_catalog(&source, CatalogOptions::default(), None).unwrap();
//!
//! let course = find_course(&build.catalog, "pr1");
//! assert_course_shape(course, &[
//!     ("Foundations", &["Welcome", "Breathing"]),
//!     ("Practice", &["Morning"]),
//! ]);
//! ```

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::path::Path;
use tempfile::TempDir;

use crate::catalog::Catalog;
use crate::types::{Chapter, ParsedCourse};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Assemble a course document from a front-matter body and a markdown body.
pub fn document(front: &str, body: &str) -> String {
    format!("---\n{front}\n---\n{body}")
}

// =========================================================================
// Time
// =========================================================================

/// A UTC instant on the hour.
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

// =========================================================================
// Catalog lookups: panic with a clear message on miss
// =========================================================================

/// Find a course by id. Panics if not found.
pub fn find_course<'a>(catalog: &'a Catalog, id: &str) -> &'a ParsedCourse {
    catalog.get_course_content(id).unwrap_or_else(|| {
        let ids = course_ids(catalog);
        panic!("course '{id}' not found. Available: {ids:?}")
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// All course ids in catalog order.
pub fn course_ids(catalog: &Catalog) -> Vec<&str> {
    catalog.get_all_courses().iter().map(|c| c.id()).collect()
}

/// All chapter titles in course order.
pub fn chapter_titles(course: &ParsedCourse) -> Vec<&str> {
    course.chapters.iter().map(|c| c.title.as_str()).collect()
}

/// All slide titles in chapter order.
pub fn slide_titles(chapter: &Chapter) -> Vec<&str> {
    chapter.slides.iter().map(|s| s.title.as_str()).collect()
}

/// Assert that a course's chapter/slide tree matches an expected shape.
///
/// Each entry is `(chapter title, slide titles)`.
pub fn assert_course_shape(course: &ParsedCourse, expected: &[(&str, &[&str])]) {
    let expected_titles: Vec<&str> = expected.iter().map(|(t, _)| *t).collect();
    assert_eq!(
        chapter_titles(course),
        expected_titles,
        "chapter titles of '{}' mismatch",
        course.id()
    );

    for (chapter, (title, slides)) in course.chapters.iter().zip(expected) {
        assert_eq!(
            slide_titles(chapter),
            slides.to_vec(),
            "slides of chapter '{title}' mismatch"
        );
    }
}
