//! Centralized parsing for the chapter-heading convention.
//!
//! Chapter headings may carry a coarse part number as a prefix:
//!
//! - `"Part 1: Foundations"` → part=Some(1), title="Foundations"
//! - `"part 2 : Breath Work"` → part=Some(2), title="Breath Work"
//! - `"Part 3:"` → part=Some(3), title="Part 3" (empty rest falls back to the heading)
//! - `"Part 9: Later"` → part=None, out_of_range=Some(9), title="Part 9: Later"
//! - `"Closing Notes"` → part=None, title="Closing Notes"
//!
//! A heading without a part prefix inherits the previous chapter's part; that
//! decision belongs to the parser, this module only reads the text.

use crate::types::MAX_PART;

/// Result of parsing a chapter heading like `Part 1: Foundations`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterHeading {
    /// Part number when the prefix is present and within range.
    pub part: Option<u8>,
    /// Chapter title: the text after the colon, or the whole heading.
    pub title: String,
    /// Part number that matched the pattern but exceeded [`MAX_PART`].
    pub out_of_range: Option<u32>,
}

/// Parse a level-2 heading following the `Part <n>: <rest>` convention.
pub fn parse_chapter_heading(text: &str) -> ChapterHeading {
    let text = text.trim();
    let plain = ChapterHeading {
        part: None,
        title: text.to_string(),
        out_of_range: None,
    };

    let Some((number, rest)) = split_part_prefix(text) else {
        return plain;
    };

    if number > u32::from(MAX_PART) {
        return ChapterHeading {
            out_of_range: Some(number),
            ..plain
        };
    }

    let rest = rest.trim();
    let title = if rest.is_empty() {
        text.trim_end_matches(':').trim_end().to_string()
    } else {
        rest.to_string()
    };
    ChapterHeading {
        part: u8::try_from(number).ok(),
        title,
        out_of_range: None,
    }
}

/// Split `Part <digits> :` off the front of a heading.
fn split_part_prefix(text: &str) -> Option<(u32, &str)> {
    let keyword = text.get(..4)?;
    if !keyword.eq_ignore_ascii_case("part") {
        return None;
    }
    let after_keyword = &text[4..];
    let digits_start = after_keyword.trim_start();
    // "Part1:" is not the convention; a separator is required.
    if digits_start.len() == after_keyword.len() {
        return None;
    }
    let digit_len = digits_start
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digit_len == 0 {
        return None;
    }
    let number = digits_start[..digit_len].parse::<u32>().ok()?;
    let rest = digits_start[digit_len..].trim_start().strip_prefix(':')?;
    Some((number, rest))
}

/// Lesson key for the slide at `slide_order` in chapter `chapter_order`.
pub fn slide_id(chapter_order: u32, slide_order: u32) -> String {
    format!("{chapter_order}.{slide_order}")
}
