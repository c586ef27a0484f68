//! Shared course model produced by the parser and served by the catalog.
//!
//! A [`ParsedCourse`] is built wholesale from one document. It is never patched
//! in place: a source edit means a full re-parse and a replacement of the
//! cached value. Every type here is serializable so parsed courses can be
//! persisted in the parse cache and handed to presentation code as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest rung of the course ladder.
pub const MIN_GATEWAY: u8 = 1;
/// Highest rung of the course ladder.
pub const MAX_GATEWAY: u8 = 5;
/// Highest `Part` number a chapter heading may carry.
pub const MAX_PART: u8 = 4;

/// Advertised difficulty of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Case-insensitive lookup used by front-matter validation.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated front-matter of one course document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseMetadata {
    /// Unique course identifier, also the key for enrollment records.
    pub id: String,
    pub title: String,
    /// Position on the course ladder (1–5). Catalog ordering key.
    pub gateway: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    pub published: bool,
}

/// The atomic content unit: a titled, rendered body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// Lesson key, `"{chapter_order}.{slide_order}"`.
    pub id: String,
    pub title: String,
    /// Sanitized HTML.
    pub content: String,
    /// 1-based position within the chapter.
    pub order: u32,
}

/// A titled group of slides belonging to one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Coarse grouping (0–4), independent of the course gateway.
    pub part: u8,
    pub title: String,
    /// Rendered text between the chapter heading and its first slide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// 1-based position within the course.
    pub order: u32,
    /// Never empty.
    pub slides: Vec<Slide>,
}

/// Non-fatal grammar irregularity found while assembling a course.
///
/// Line numbers are 1-based and refer to the whole document, front-matter
/// included, so authors can jump straight to the offending heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralWarning {
    /// A level-1 heading after the course title was already set.
    ExtraTitle { line: usize, text: String },
    /// A slide heading appeared before any chapter heading.
    SlideBeforeChapter { line: usize },
    /// A chapter heading with neither slides nor text.
    EmptyChapter { line: usize, title: String },
    /// A `Part N:` heading whose number is outside 0–4.
    PartOutOfRange { line: usize, part: u32 },
}

impl fmt::Display for StructuralWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtraTitle { line, text } => {
                write!(f, "line {line}: extra title heading \"{text}\" ignored")
            }
            Self::SlideBeforeChapter { line } => write!(
                f,
                "line {line}: slide heading before any chapter, implicit chapter created"
            ),
            Self::EmptyChapter { line, title } => {
                write!(f, "line {line}: chapter \"{title}\" has no content")
            }
            Self::PartOutOfRange { line, part } => write!(
                f,
                "line {line}: part {part} is outside 0-{MAX_PART}, heading kept as plain title"
            ),
        }
    }
}

/// One course document, fully parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCourse {
    pub metadata: CourseMetadata,
    /// First level-1 heading of the body, or the metadata title.
    pub display_title: String,
    /// Rendered text between the title and the first chapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,
    pub chapters: Vec<Chapter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<StructuralWarning>,
}

impl ParsedCourse {
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn total_chapters(&self) -> usize {
        self.chapters.len()
    }

    pub fn total_slides(&self) -> usize {
        self.chapters.iter().map(|c| c.slides.len()).sum()
    }

    /// All slides in reading order.
    pub fn slides(&self) -> impl Iterator<Item = &Slide> {
        self.chapters.iter().flat_map(|c| c.slides.iter())
    }

    pub fn find_slide(&self, lesson_id: &str) -> Option<&Slide> {
        self.slides().find(|s| s.id == lesson_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(id: &str) -> Slide {
        Slide {
            id: id.to_string(),
            title: id.to_string(),
            content: String::new(),
            order: 1,
        }
    }

    fn course(chapter_sizes: &[usize]) -> ParsedCourse {
        let chapters = chapter_sizes
            .iter()
            .enumerate()
            .map(|(ci, &n)| Chapter {
                part: 0,
                title: format!("Chapter {}", ci + 1),
                summary: None,
                order: ci as u32 + 1,
                slides: (1..=n).map(|si| slide(&format!("{}.{}", ci + 1, si))).collect(),
            })
            .collect();
        ParsedCourse {
            metadata: CourseMetadata {
                id: "c".into(),
                title: "C".into(),
                gateway: 1,
                instructor: None,
                duration: None,
                difficulty: None,
                published: true,
            },
            display_title: "C".into(),
            intro: None,
            chapters,
            warnings: vec![],
        }
    }

    #[test]
    fn totals_sum_over_chapters() {
        let c = course(&[2, 3, 1]);
        assert_eq!(c.total_chapters(), 3);
        assert_eq!(c.total_slides(), 6);
    }

    #[test]
    fn find_slide_by_lesson_id() {
        let c = course(&[2, 2]);
        assert_eq!(c.find_slide("2.1").map(|s| s.id.as_str()), Some("2.1"));
        assert!(c.find_slide("3.1").is_none());
    }

    #[test]
    fn difficulty_parse_is_case_insensitive() {
        assert_eq!(Difficulty::parse("Beginner"), Some(Difficulty::Beginner));
        assert_eq!(Difficulty::parse(" ADVANCED "), Some(Difficulty::Advanced));
        assert_eq!(Difficulty::parse("expert"), None);
    }

    #[test]
    fn warning_serializes_with_kind_tag() {
        let w = StructuralWarning::SlideBeforeChapter { line: 4 };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "slide_before_chapter");
        assert_eq!(json["line"], 4);
    }
}
