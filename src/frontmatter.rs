//! Front-matter extraction and strict metadata validation.
//!
//! A course document opens with a YAML block fenced by `---` lines:
//!
//! ```text
//! ---
//! id: pr1
//! title: Stabilize
//! gateway: 1
//! instructor: Dana Reyes      # optional
//! duration: 6 weeks           # optional
//! difficulty: beginner        # optional: beginner | intermediate | advanced
//! published: true             # optional, defaults to true
//! ---
//! # Stabilize
//! ...
//! ```
//!
//! The block may also be closed with `...`. Unknown keys are ignored so
//! authors can keep tags and notes next to the schema fields; the schema
//! fields themselves are checked strictly and rejected early rather than
//! passed downstream half-formed.

use crate::types::{CourseMetadata, Difficulty, MAX_GATEWAY, MIN_GATEWAY};
use serde_yaml_ng::Value;
use thiserror::Error;

/// Why a single document could not become a course.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentParseError {
    #[error("document has no front-matter block")]
    MissingFrontMatter,
    #[error("front-matter block is never closed")]
    UnterminatedFrontMatter,
    #[error("front-matter is not valid YAML: {0}")]
    InvalidFrontMatter(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("course id `{0}` is already used by an earlier document")]
    DuplicateId(String),
}

/// A document split at the end of its front-matter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitDocument<'a> {
    /// Raw YAML between the fences.
    pub front_matter: &'a str,
    /// Everything after the closing fence.
    pub body: &'a str,
    /// Number of document lines before the body starts.
    pub body_offset: usize,
}

/// Split a raw document into its front-matter block and body.
pub fn split_front_matter(input: &str) -> Result<SplitDocument<'_>, DocumentParseError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut lines = input.split_inclusive('\n');

    let first = lines.next().ok_or(DocumentParseError::MissingFrontMatter)?;
    if first.trim_end() != "---" {
        return Err(DocumentParseError::MissingFrontMatter);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    let mut consumed = 1;
    for line in lines {
        consumed += 1;
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Ok(SplitDocument {
                front_matter: &input[yaml_start..offset],
                body: &input[offset + line.len()..],
                body_offset: consumed,
            });
        }
        offset += line.len();
    }

    Err(DocumentParseError::UnterminatedFrontMatter)
}

/// Validate a YAML front-matter block against the course metadata schema.
pub fn parse_metadata(yaml: &str) -> Result<CourseMetadata, DocumentParseError> {
    let value: Value = serde_yaml_ng::from_str(yaml)
        .map_err(|e| DocumentParseError::InvalidFrontMatter(e.to_string()))?;
    let fields = match value {
        // An empty block parses as null; report the first missing field instead.
        Value::Null => Value::Mapping(Default::default()),
        Value::Mapping(_) => value,
        _ => {
            return Err(DocumentParseError::InvalidFrontMatter(
                "expected a map of fields".into(),
            ));
        }
    };

    Ok(CourseMetadata {
        id: required_string(&fields, "id")?,
        title: required_string(&fields, "title")?,
        gateway: gateway(&fields)?,
        instructor: optional_text(&fields, "instructor")?,
        duration: optional_text(&fields, "duration")?,
        difficulty: difficulty(&fields)?,
        published: published(&fields)?,
    })
}

fn present<'a>(fields: &'a Value, field: &str) -> Option<&'a Value> {
    fields.get(field).filter(|v| !v.is_null())
}

fn required_string(fields: &Value, field: &'static str) -> Result<String, DocumentParseError> {
    let value = present(fields, field).ok_or(DocumentParseError::MissingField(field))?;
    let text = value.as_str().ok_or_else(|| DocumentParseError::InvalidField {
        field,
        reason: "expected a string".into(),
    })?;
    let text = text.trim();
    if text.is_empty() {
        return Err(DocumentParseError::InvalidField {
            field,
            reason: "must not be empty".into(),
        });
    }
    Ok(text.to_string())
}

fn gateway(fields: &Value) -> Result<u8, DocumentParseError> {
    let field = "gateway";
    let value = present(fields, field).ok_or(DocumentParseError::MissingField(field))?;
    let range = || format!("expected an integer from {MIN_GATEWAY} to {MAX_GATEWAY}");
    let number = value
        .as_u64()
        .ok_or_else(|| DocumentParseError::InvalidField {
            field,
            reason: range(),
        })?;
    u8::try_from(number)
        .ok()
        .filter(|g| (MIN_GATEWAY..=MAX_GATEWAY).contains(g))
        .ok_or_else(|| DocumentParseError::InvalidField {
            field,
            reason: range(),
        })
}

/// Display-only fields accept strings or numbers (`duration: 45`).
fn optional_text(
    fields: &Value,
    field: &'static str,
) -> Result<Option<String>, DocumentParseError> {
    let Some(value) = present(fields, field) else {
        return Ok(None);
    };
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => {
            return Err(DocumentParseError::InvalidField {
                field,
                reason: "expected a string".into(),
            });
        }
    };
    Ok((!text.is_empty()).then_some(text))
}

fn difficulty(fields: &Value) -> Result<Option<Difficulty>, DocumentParseError> {
    let field = "difficulty";
    let Some(value) = present(fields, field) else {
        return Ok(None);
    };
    value
        .as_str()
        .and_then(Difficulty::parse)
        .map(Some)
        .ok_or_else(|| DocumentParseError::InvalidField {
            field,
            reason: "expected beginner, intermediate or advanced".into(),
        })
}

fn published(fields: &Value) -> Result<bool, DocumentParseError> {
    let field = "published";
    match present(fields, field) {
        None => Ok(true),
        Some(value) => value.as_bool().ok_or_else(|| DocumentParseError::InvalidField {
            field,
            reason: "expected true or false".into(),
        }),
    }
}
