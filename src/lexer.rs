//! Body tokenizer: the first of the parser's two phases.
//!
//! Turns a markdown body into a flat stream of [`Token`]s in source order.
//! Only ATX headings (`#` through `######`) are structural; everything else,
//! including lines inside fenced code blocks, is a [`Token::TextLine`]. The
//! parser folds this stream into chapters and slides, so lexical rules and
//! structural recovery can be tested independently.

/// One line of a document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Heading {
        /// 1–6.
        level: u8,
        /// Heading text with the marker and any closing `#`s removed.
        text: &'a str,
        /// The source line, for headings that fold back into slide text.
        raw: &'a str,
        /// 1-based line within the body.
        line: usize,
    },
    TextLine {
        text: &'a str,
        line: usize,
    },
}

impl<'a> Token<'a> {
    pub fn line(&self) -> usize {
        match self {
            Token::Heading { line, .. } | Token::TextLine { line, .. } => *line,
        }
    }

    /// The line as it appeared in the source.
    pub fn raw(&self) -> &'a str {
        match self {
            Token::Heading { raw, .. } => raw,
            Token::TextLine { text, .. } => text,
        }
    }
}

/// Tokenize a markdown body.
pub fn tokenize(body: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut open_fence: Option<(char, usize)> = None;

    for (idx, raw) in body.lines().enumerate() {
        let line = idx + 1;

        if let Some((fence_char, fence_len)) = open_fence {
            if closes_fence(raw, fence_char, fence_len) {
                open_fence = None;
            }
            tokens.push(Token::TextLine { text: raw, line });
            continue;
        }

        if let Some(marker) = fence_marker(raw) {
            open_fence = Some(marker);
            tokens.push(Token::TextLine { text: raw, line });
            continue;
        }

        match atx_heading(raw) {
            Some((level, text)) => tokens.push(Token::Heading {
                level,
                text,
                raw,
                line,
            }),
            None => tokens.push(Token::TextLine { text: raw, line }),
        }
    }

    tokens
}

/// Count leading spaces; more than three means an indented code line.
fn strip_indent(line: &str) -> Option<&str> {
    let trimmed = line.trim_start_matches(' ');
    (line.len() - trimmed.len() <= 3).then_some(trimmed)
}

/// Opening or closing code fence: at least three backticks or tildes.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let trimmed = strip_indent(line)?;
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let run = trimmed.chars().take_while(|&c| c == first).count();
    (run >= 3).then_some((first, run))
}

/// A closing fence repeats the opening character at least as many times and
/// carries nothing but whitespace after the run.
fn closes_fence(line: &str, fence_char: char, fence_len: usize) -> bool {
    let Some(trimmed) = strip_indent(line) else {
        return false;
    };
    let rest = trimmed.trim_start_matches(fence_char);
    let run = trimmed.len() - rest.len();
    run >= fence_len && rest.trim().is_empty()
}

/// Parse an ATX heading line into `(level, text)`.
fn atx_heading(line: &str) -> Option<(u8, &str)> {
    let trimmed = strip_indent(line)?;
    let level = trimmed.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(|c: char| c == ' ' || c == '\t') {
        return None;
    }
    Some((level as u8, strip_closing_sequence(rest.trim())))
}

/// Drop an optional closing `###` sequence (`## Title ##` → `Title`).
fn strip_closing_sequence(text: &str) -> &str {
    let without = text.trim_end_matches('#');
    if without.len() == text.len() {
        return text;
    }
    if without.is_empty() {
        return "";
    }
    if without.ends_with(|c: char| c == ' ' || c == '\t') {
        without.trim_end()
    } else {
        text
    }
}
