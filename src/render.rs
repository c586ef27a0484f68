//! Markdown to sanitized HTML.
//!
//! Slide bodies are authored markdown, but the HTML handed to the
//! presentation layer must be safe to inline. Rendering goes through
//! `pulldown-cmark` with one filtering pass over the event stream:
//!
//! - raw HTML (block or inline) is emitted as escaped text
//! - link and image destinations with a scheme other than `http`, `https`
//!   or `mailto` are replaced with `#`
//!
//! Relative URLs, fragments and query-only links pass through untouched.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html as md_html};

/// Render a markdown fragment to sanitized HTML.
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_TASKLISTS;
    let events = Parser::new_ext(markdown, options).map(sanitize_event);
    let mut html = String::new();
    md_html::push_html(&mut html, events);
    html
}

fn sanitize_event(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) {
        url
    } else {
        CowStr::Borrowed("#")
    }
}

fn is_safe_url(url: &str) -> bool {
    let normalized: String = url
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_control() && !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    let Some(colon) = normalized.find(':') else {
        return true;
    };
    let scheme = &normalized[..colon];
    // A colon after a path, query or fragment separator is not a scheme.
    if scheme.contains(|c: char| matches!(c, '/' | '?' | '#')) {
        return true;
    }
    matches!(scheme, "http" | "https" | "mailto")
}
