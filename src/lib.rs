//! # Course Unlock
//!
//! A course-content engine for a guided wellbeing curriculum. Course documents
//! are plain markdown files with a YAML front-matter block; headings define the
//! structure. Learner progress is a set of write-once completion records, and
//! every lock/unlock decision is derived from those records.
//!
//! # Architecture: Two Halves
//!
//! ```text
//! 1. Catalog   documents  →  Catalog      (markdown → structured courses)
//! 2. Progress  records    →  UnitState    (completion records → gating + stats)
//! ```
//!
//! The catalog side is synchronous and CPU-bound: documents are tokenized and
//! folded into courses in parallel with rayon. The progress side is async at
//! its edges only: a [`tracker::ProgressTracker`] loads a
//! [`progress::ProgressSnapshot`] from a [`progress::ProgressStore`], and every
//! rule after that is a pure function over the snapshot.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`source`] | Where documents come from: a content directory or an in-memory set |
//! | [`frontmatter`] | Splits the `---` block off a document and validates its metadata |
//! | [`lexer`] | Line-oriented tokenizer for the heading grammar |
//! | [`parser`] | Folds tokens into chapters and slides, collecting structural warnings |
//! | [`naming`] | `Part N: Title` chapter headings and `chapter.slide` lesson ids |
//! | [`render`] | Markdown → sanitized HTML for slide bodies and summaries |
//! | [`cache`] | Content-hash parse cache so unchanged documents skip re-parsing |
//! | [`catalog`] | Builds the gateway-ordered course catalog with per-document failures |
//! | [`types`] | Parsed course types shared by every stage |
//! | [`progress`] | Completion records, unit keys, storage backends, snapshots |
//! | [`gating`] | Unlock rules for program days and gateway courses |
//! | [`stats`] | Streaks, percentages, enrollment progress |
//! | [`tracker`] | Async facade binding a store, a clock, and the learner's UTC offset |
//! | [`config`] | `config.toml` loading, validation, and stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Records, Not State
//!
//! Nothing stores "unlocked". A day or course is unlocked because a record for
//! its predecessor exists, so there is no state to drift out of sync with the
//! records. Records are write-once; a second write for the same key is refused
//! by the store and surfaces as "already completed".
//!
//! ## Calendar Days in the Learner's Zone
//!
//! Streaks count calendar days, not 24-hour windows. A completion at 23:00 and
//! another at 07:00 the next morning are consecutive days. Dates are taken in a
//! fixed UTC offset supplied by config so the same records give the same streak
//! on every machine.
//!
//! ## Failures Stay Local
//!
//! One malformed document never hides the rest of the catalog. Parse failures
//! are collected per document and reported next to the courses that did parse.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod frontmatter;
pub mod gating;
pub mod lexer;
pub mod naming;
pub mod output;
pub mod parser;
pub mod progress;
pub mod render;
pub mod source;
pub mod stats;
pub mod tracker;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
