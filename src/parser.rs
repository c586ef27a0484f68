//! Course document parser.
//!
//! Turns one raw document into a [`ParsedCourse`] in two phases: the
//! [`lexer`](crate::lexer) produces a flat token stream, then
//! [`assemble`] folds the tokens into the Course → Chapter → Slide tree.
//!
//! ## Heading Grammar
//!
//! | Heading | Meaning |
//! |---------|---------|
//! | `# Title` | Course display title. First one wins; later ones are dropped with a warning |
//! | `## Part 1: Foundations` | New chapter in part 1, titled "Foundations" |
//! | `## Closing Notes` | New chapter, inherits the previous chapter's part (0 for the first) |
//! | `### Welcome` | New slide in the current chapter |
//! | `####`–`######` | Ordinary slide content |
//!
//! ## Recovery Rules
//!
//! The parser never fails on structure, only on metadata. Irregular bodies are
//! repaired and reported as [`StructuralWarning`]s:
//!
//! - no chapter or slide headings at all → one chapter holding one slide with the whole body
//! - a slide heading before any chapter → an implicit part-0 chapter titled after the course
//! - a chapter without slide headings → one implicit slide holding the chapter's text
//! - a chapter with nothing in it → one empty slide, plus a warning
//!
//! Parsing is a pure function of the input text: identical bytes always give
//! structurally identical output, which is what lets the catalog cache results
//! by content hash.

use crate::frontmatter::{DocumentParseError, parse_metadata, split_front_matter};
use crate::lexer::{Token, tokenize};
use crate::naming::{parse_chapter_heading, slide_id};
use crate::render::render_markdown;
use crate::types::{Chapter, CourseMetadata, ParsedCourse, Slide, StructuralWarning};

/// Parse a complete document (front-matter + body).
pub fn parse_document(input: &str) -> Result<ParsedCourse, DocumentParseError> {
    let doc = split_front_matter(input)?;
    let metadata = parse_metadata(doc.front_matter)?;
    let tokens = tokenize(doc.body);
    Ok(assemble(metadata, &tokens, doc.body_offset))
}

/// Fold a token stream into a course tree.
///
/// `line_offset` is added to token line numbers so warnings point at lines of
/// the whole document rather than of the body.
pub fn assemble(
    metadata: CourseMetadata,
    tokens: &[Token<'_>],
    line_offset: usize,
) -> ParsedCourse {
    let mut builder = CourseBuilder::new(line_offset);
    for token in tokens {
        builder.push(token);
    }
    builder.finish(metadata)
}

struct SlideDraft<'a> {
    title: String,
    lines: Vec<&'a str>,
}

struct ChapterDraft<'a> {
    part: u8,
    /// `None` for the implicit chapter; titled after the course at the end.
    title: Option<String>,
    line: usize,
    preamble: Vec<&'a str>,
    slides: Vec<SlideDraft<'a>>,
}

struct CourseBuilder<'a> {
    display_title: Option<String>,
    intro: Vec<&'a str>,
    chapters: Vec<ChapterDraft<'a>>,
    warnings: Vec<StructuralWarning>,
    line_offset: usize,
}

impl<'a> CourseBuilder<'a> {
    fn new(line_offset: usize) -> Self {
        Self {
            display_title: None,
            intro: Vec::new(),
            chapters: Vec::new(),
            warnings: Vec::new(),
            line_offset,
        }
    }

    fn push(&mut self, token: &Token<'a>) {
        let line = token.line() + self.line_offset;
        match *token {
            Token::Heading {
                level: 1, text, ..
            } => {
                if self.display_title.is_none() && !text.is_empty() {
                    self.display_title = Some(text.to_string());
                } else {
                    // Dropped without closing the open slide.
                    self.warnings.push(StructuralWarning::ExtraTitle {
                        line,
                        text: text.to_string(),
                    });
                }
            }
            Token::Heading {
                level: 2, text, ..
            } => self.open_chapter(text, line),
            Token::Heading {
                level: 3, text, ..
            } => self.open_slide(text, line),
            _ => self.push_text(token.raw()),
        }
    }

    fn open_chapter(&mut self, text: &str, line: usize) {
        let heading = parse_chapter_heading(text);
        if let Some(part) = heading.out_of_range {
            self.warnings
                .push(StructuralWarning::PartOutOfRange { line, part });
        }
        let inherited = self.chapters.last().map(|c| c.part).unwrap_or(0);
        self.chapters.push(ChapterDraft {
            part: heading.part.unwrap_or(inherited),
            title: Some(heading.title),
            line,
            preamble: Vec::new(),
            slides: Vec::new(),
        });
    }

    fn open_slide(&mut self, text: &str, line: usize) {
        if self.chapters.is_empty() {
            self.warnings
                .push(StructuralWarning::SlideBeforeChapter { line });
            self.chapters.push(ChapterDraft {
                part: 0,
                title: None,
                line,
                preamble: Vec::new(),
                slides: Vec::new(),
            });
        }
        if let Some(chapter) = self.chapters.last_mut() {
            chapter.slides.push(SlideDraft {
                title: text.to_string(),
                lines: Vec::new(),
            });
        }
    }

    fn push_text(&mut self, raw: &'a str) {
        match self.chapters.last_mut() {
            Some(chapter) => match chapter.slides.last_mut() {
                Some(slide) => slide.lines.push(raw),
                None => chapter.preamble.push(raw),
            },
            None => self.intro.push(raw),
        }
    }

    fn finish(mut self, metadata: CourseMetadata) -> ParsedCourse {
        let display_title = self
            .display_title
            .take()
            .unwrap_or_else(|| metadata.title.clone());

        let (intro, drafts) = if self.chapters.is_empty() {
            // No structure at all: the whole body is a single slide.
            let implicit = ChapterDraft {
                part: 0,
                title: None,
                line: 0,
                preamble: Vec::new(),
                slides: vec![SlideDraft {
                    title: display_title.clone(),
                    lines: std::mem::take(&mut self.intro),
                }],
            };
            (None, vec![implicit])
        } else {
            (render_block(&self.intro), std::mem::take(&mut self.chapters))
        };

        let chapters = drafts
            .into_iter()
            .enumerate()
            .map(|(idx, draft)| self.finish_chapter(idx as u32 + 1, draft, &display_title))
            .collect();

        ParsedCourse {
            metadata,
            display_title,
            intro,
            chapters,
            warnings: self.warnings,
        }
    }

    fn finish_chapter(
        &mut self,
        order: u32,
        draft: ChapterDraft<'_>,
        course_title: &str,
    ) -> Chapter {
        let title = draft.title.unwrap_or_else(|| course_title.to_string());

        let (summary, slide_drafts) = if !draft.slides.is_empty() {
            (render_block(&draft.preamble), draft.slides)
        } else {
            if is_blank(&draft.preamble) {
                self.warnings.push(StructuralWarning::EmptyChapter {
                    line: draft.line,
                    title: title.clone(),
                });
            }
            let implicit = SlideDraft {
                title: title.clone(),
                lines: draft.preamble,
            };
            (None, vec![implicit])
        };

        let slides = slide_drafts
            .into_iter()
            .enumerate()
            .map(|(idx, slide)| {
                let slide_order = idx as u32 + 1;
                Slide {
                    id: slide_id(order, slide_order),
                    title: slide.title,
                    content: render_markdown(&slide.lines.join("\n")),
                    order: slide_order,
                }
            })
            .collect();

        Chapter {
            part: draft.part,
            title,
            summary,
            order,
            slides,
        }
    }
}

fn is_blank(lines: &[&str]) -> bool {
    lines.iter().all(|l| l.trim().is_empty())
}

fn render_block(lines: &[&str]) -> Option<String> {
    if is_blank(lines) {
        None
    } else {
        Some(render_markdown(&lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{chapter_titles, document, slide_titles};

    const FRONT: &str = "id: pr1\ntitle: Stabilize\ngateway: 1";

    fn parse(body: &str) -> ParsedCourse {
        parse_document(&document(FRONT, body)).unwrap()
    }

    // =========================================================================
    // Grammar
    // =========================================================================

    #[test]
    fn part_chapter_with_two_slides() {
        let course = parse(
            "# Stabilize\n## Part 1: Foundations\n### Welcome\nHello there.\n### Breathing\nIn and out.",
        );
        assert_eq!(course.display_title, "Stabilize");
        assert_eq!(course.total_chapters(), 1);
        assert_eq!(course.total_slides(), 2);

        let chapter = &course.chapters[0];
        assert_eq!(chapter.part, 1);
        assert_eq!(chapter.title, "Foundations");
        assert_eq!(chapter.order, 1);
        assert_eq!(slide_titles(chapter), vec!["Welcome", "Breathing"]);
        assert!(chapter.slides[0].content.contains("<p>Hello there.</p>"));
        assert_eq!(chapter.slides[1].id, "1.2");
        assert_eq!(chapter.slides[1].order, 2);
        assert!(course.warnings.is_empty());
    }

    #[test]
    fn chapters_inherit_previous_part() {
        let course = parse(
            "## Part 2: Body\n### A\n## More Body\n### B\n## Part 3: Mind\n### C\n## Wrap Up\n### D",
        );
        let parts: Vec<u8> = course.chapters.iter().map(|c| c.part).collect();
        assert_eq!(parts, vec![2, 2, 3, 3]);
        assert_eq!(
            chapter_titles(&course),
            vec!["Body", "More Body", "Mind", "Wrap Up"]
        );
    }

    #[test]
    fn first_chapter_without_part_defaults_to_zero() {
        let course = parse("## Orientation\n### Hi\n## Part 1: Start\n### Go");
        assert_eq!(course.chapters[0].part, 0);
        assert_eq!(course.chapters[1].part, 1);
    }

    #[test]
    fn slide_content_stops_at_next_heading() {
        let course = parse("## C\n### One\nfirst\n### Two\nsecond\n## D\n### Three\nthird");
        let contents: Vec<&str> = course.slides().map(|s| s.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["<p>first</p>\n", "<p>second</p>\n", "<p>third</p>\n"]
        );
    }

    #[test]
    fn deep_headings_stay_in_slide() {
        let course = parse("## C\n### Slide\n#### Sub point\ntext");
        assert_eq!(course.total_slides(), 1);
        let content = &course.chapters[0].slides[0].content;
        assert!(content.contains("<h4>Sub point</h4>"));
        assert!(content.contains("<p>text</p>"));
    }

    #[test]
    fn headings_in_code_blocks_are_content() {
        let course = parse("## C\n### Slide\n```\n## not a chapter\n```");
        assert_eq!(course.total_chapters(), 1);
        assert!(course.chapters[0].slides[0].content.contains("## not a chapter"));
    }

    #[test]
    fn intro_and_summary_captured() {
        let course = parse("# T\nWelcome aboard.\n## Part 1: C\nIn this chapter.\n### S\nBody");
        assert_eq!(course.intro.as_deref(), Some("<p>Welcome aboard.</p>\n"));
        assert_eq!(
            course.chapters[0].summary.as_deref(),
            Some("<p>In this chapter.</p>\n")
        );
        assert_eq!(course.total_slides(), 1);
    }

    #[test]
    fn display_title_falls_back_to_metadata() {
        let course = parse("## C\n### S");
        assert_eq!(course.display_title, "Stabilize");
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    #[test]
    fn extra_title_ignored_with_warning() {
        let course = parse("# First\n## C\n### S\n# Second\nafter");
        assert_eq!(course.display_title, "First");
        assert_eq!(
            course.warnings,
            vec![StructuralWarning::ExtraTitle {
                line: 9,
                text: "Second".into()
            }]
        );
        let content = &course.chapters[0].slides[0].content;
        assert!(content.contains("after"));
        assert!(!content.contains("Second"));
        assert_eq!(course.chapters[0].slides.len(), 1);
    }

    #[test]
    fn no_chapter_headings_gives_implicit_chapter() {
        let course = parse("# T\n### One\na\n### Two\nb");
        assert_eq!(course.total_chapters(), 1);
        let chapter = &course.chapters[0];
        assert_eq!(chapter.part, 0);
        assert_eq!(chapter.title, "T");
        assert_eq!(slide_titles(chapter), vec!["One", "Two"]);
        assert_eq!(
            course.warnings,
            vec![StructuralWarning::SlideBeforeChapter { line: 7 }]
        );
    }

    #[test]
    fn chapter_without_slides_gets_implicit_slide() {
        let course = parse("## Part 1: Only Text\nJust a paragraph.\n## Part 2: Real\n### S\nx");
        assert_eq!(course.total_slides(), 2);
        let first = &course.chapters[0];
        assert_eq!(slide_titles(first), vec!["Only Text"]);
        assert!(first.slides[0].content.contains("Just a paragraph."));
        assert_eq!(first.summary, None);
        assert!(course.warnings.is_empty());
    }

    #[test]
    fn empty_chapter_warns_and_keeps_slides_non_empty() {
        let course = parse("## Empty\n## Full\n### S\nx");
        assert_eq!(course.chapters[0].slides.len(), 1);
        assert_eq!(course.chapters[0].slides[0].content, "");
        assert_eq!(
            course.warnings,
            vec![StructuralWarning::EmptyChapter {
                line: 6,
                title: "Empty".into()
            }]
        );
    }

    #[test]
    fn body_without_headings_is_one_slide() {
        let course = parse("# Title Only\nParagraph one.\n\nParagraph two.");
        assert_eq!(course.total_chapters(), 1);
        assert_eq!(course.total_slides(), 1);
        let slide = &course.chapters[0].slides[0];
        assert_eq!(slide.title, "Title Only");
        assert!(slide.content.contains("Paragraph one."));
        assert!(slide.content.contains("Paragraph two."));
        assert_eq!(course.intro, None);
        assert!(course.warnings.is_empty());
    }

    #[test]
    fn empty_body_still_has_one_slide() {
        let course = parse("");
        assert_eq!(course.total_chapters(), 1);
        assert_eq!(course.total_slides(), 1);
        assert_eq!(course.chapters[0].slides[0].content, "");
    }

    #[test]
    fn part_out_of_range_inherits_and_warns() {
        let course = parse("## Part 2: A\n### S\n## Part 7: B\n### T");
        assert_eq!(course.chapters[1].part, 2);
        assert_eq!(course.chapters[1].title, "Part 7: B");
        assert_eq!(
            course.warnings,
            vec![StructuralWarning::PartOutOfRange { line: 8, part: 7 }]
        );
    }

    // =========================================================================
    // Errors and properties
    // =========================================================================

    #[test]
    fn metadata_errors_stop_parsing() {
        let doc = document("id: x\ntitle: X", "## C\n### S");
        assert_eq!(
            parse_document(&doc),
            Err(DocumentParseError::MissingField("gateway"))
        );
        assert_eq!(
            parse_document("## C\n### S"),
            Err(DocumentParseError::MissingFrontMatter)
        );
    }

    #[test]
    fn raw_html_in_slides_is_sanitized() {
        let course = parse("## C\n### S\n<iframe src=\"https://evil\"></iframe>");
        let content = &course.chapters[0].slides[0].content;
        assert!(!content.contains("<iframe"));
    }

    #[test]
    fn parsing_is_deterministic() {
        let doc = document(
            FRONT,
            "# T\nintro\n## Part 1: A\nsum\n### S1\nx\n### S2\ny\n## B\n## Part 9: Z\n### S3",
        );
        let first = parse_document(&doc).unwrap();
        let second = parse_document(&doc).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn total_slides_matches_chapter_sum() {
        let course = parse("## A\n### 1\n### 2\n## B\ntext\n## C\n### 3\n### 4\n### 5");
        let summed: usize = course.chapters.iter().map(|c| c.slides.len()).sum();
        assert_eq!(course.total_slides(), summed);
        assert_eq!(summed, 6);
        assert!(course.chapters.iter().all(|c| !c.slides.is_empty()));
    }
}
