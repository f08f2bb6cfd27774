use crate::types::AdrStatus;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::{bold_field, bullet_text, strip_comments};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adr {
    pub id: String,
    pub title: String,
    pub status: AdrStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub context: String,
    pub decision: String,
    pub consequences: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

static HEADING_RE: OnceLock<Regex> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"^### (ADR-\d{3}):\s*(.*)$").unwrap())
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Context,
    Decision,
    Consequences,
    Alternatives,
}

/// Extract ADR records from a design document. Labelled sub-paragraphs
/// (`**Context**:`, `**Decision**:`, ...) may span multiple lines; the
/// `Alternatives` label introduces a bullet list.
pub fn parse(content: &str) -> Vec<Adr> {
    let cleaned = strip_comments(content);
    let mut out: Vec<Adr> = Vec::new();
    let mut section = Section::None;

    for line in cleaned.lines() {
        if let Some(caps) = heading_re().captures(line) {
            out.push(Adr {
                id: caps[1].to_string(),
                title: caps[2].trim().to_string(),
                status: AdrStatus::Proposed,
                date: None,
                context: String::new(),
                decision: String::new(),
                consequences: String::new(),
                alternatives: Vec::new(),
            });
            section = Section::None;
            continue;
        }
        if line.starts_with("##") {
            section = Section::None;
            continue;
        }
        let Some(adr) = out.last_mut() else { continue };
        let trimmed = line.trim();

        if let Some(v) = bold_field(trimmed, "Status") {
            if let Ok(s) = v.parse() {
                adr.status = s;
            }
            section = Section::None;
        } else if let Some(v) = bold_field(trimmed, "Date") {
            adr.date = Some(v.to_string());
            section = Section::None;
        } else if let Some(v) = bold_field(trimmed, "Context") {
            adr.context = v.to_string();
            section = Section::Context;
        } else if let Some(v) = bold_field(trimmed, "Decision") {
            adr.decision = v.to_string();
            section = Section::Decision;
        } else if let Some(v) = bold_field(trimmed, "Consequences") {
            adr.consequences = v.to_string();
            section = Section::Consequences;
        } else if bold_field(trimmed, "Alternatives").is_some() {
            section = Section::Alternatives;
        } else if !trimmed.is_empty() {
            // Continuation of the current labelled paragraph.
            match section {
                Section::Context => append_line(&mut adr.context, trimmed),
                Section::Decision => append_line(&mut adr.decision, trimmed),
                Section::Consequences => append_line(&mut adr.consequences, trimmed),
                Section::Alternatives => {
                    if let Some(item) = bullet_text(trimmed) {
                        adr.alternatives.push(item.to_string());
                    } else {
                        section = Section::None;
                    }
                }
                Section::None => {}
            }
        }
    }
    out
}

fn append_line(buf: &mut String, line: &str) {
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(line);
}
