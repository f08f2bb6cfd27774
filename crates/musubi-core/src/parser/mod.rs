//! Structured extraction from Markdown-like artifact documents.
//!
//! Parsers here are tolerant by contract: malformed content produces empty
//! or partial results, never an error. Structural problems are surfaced by
//! the validators in [`crate::validate`].

pub mod adr;
pub mod delta;
pub mod requirement;
pub mod task;

/// Strip HTML comments and trailing whitespace from a document before
/// line-oriented parsing. Comments may span lines.
pub(crate) fn strip_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        match rest[start..].find("-->") {
            Some(end) => rest = &rest[start + end + 3..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Value of a bold-labelled field line: `**Label**: value` or `**Label:** value`.
pub(crate) fn bold_field<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let line = line.trim();
    for prefix in [
        format!("**{label}**:"),
        format!("**{label}:**"),
        format!("- **{label}**:"),
        format!("- **{label}:**"),
    ] {
        if let Some(rest) = line.strip_prefix(&prefix) {
            return Some(rest.trim());
        }
    }
    None
}

/// Text of a bullet line (`- item` or `* item`), with any checkbox removed.
pub(crate) fn bullet_text(line: &str) -> Option<&str> {
    let line = line.trim();
    let rest = line.strip_prefix("- ").or_else(|| line.strip_prefix("* "))?;
    let rest = rest
        .strip_prefix("[ ] ")
        .or_else(|| rest.strip_prefix("[x] "))
        .or_else(|| rest.strip_prefix("[X] "))
        .unwrap_or(rest);
    Some(rest.trim())
}
