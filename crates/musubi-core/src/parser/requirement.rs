use crate::ears;
use crate::id::ReqId;
use crate::types::EarsPattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::{bullet_text, strip_comments};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub id: String,
    pub title: String,
    pub statement: String,
    pub pattern: EarsPattern,
    pub acceptance_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Requirement {
    pub fn req_id(&self) -> Option<ReqId> {
        ReqId::parse(&self.id).ok()
    }
}

static HEADING_RE: OnceLock<Regex> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"^### (REQ-[A-Z0-9]+-\d{3}):\s*(.*)$").unwrap())
}

/// Extract requirement blocks from a document.
///
/// Each block is a `### REQ-<COMP>-<NNN>: <title>` heading followed by the
/// canonical statement paragraph. An `Acceptance Criteria` label introduces
/// a checklist; everything else between blocks is ignored.
pub fn parse(content: &str) -> Vec<Requirement> {
    let cleaned = strip_comments(content);
    let mut out: Vec<Requirement> = Vec::new();
    let mut in_criteria = false;
    let mut in_statement = false;
    let mut block_open = false;

    for line in cleaned.lines() {
        if let Some(caps) = heading_re().captures(line) {
            out.push(Requirement {
                id: caps[1].to_string(),
                title: caps[2].trim().to_string(),
                statement: String::new(),
                pattern: EarsPattern::Unknown,
                acceptance_criteria: Vec::new(),
                source: None,
            });
            in_criteria = false;
            in_statement = false;
            block_open = true;
            continue;
        }
        if line.starts_with("##") {
            // Any other heading ends the current block.
            in_criteria = false;
            in_statement = false;
            block_open = false;
            continue;
        }
        if !block_open {
            continue;
        }
        let Some(current) = out.last_mut() else {
            continue;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            in_statement = false;
            continue;
        }
        let lower = trimmed.to_lowercase();
        if lower.contains("acceptance criteria") && trimmed.starts_with("**") {
            in_criteria = true;
            in_statement = false;
            continue;
        }
        if in_criteria {
            if let Some(item) = bullet_text(trimmed) {
                current.acceptance_criteria.push(item.to_string());
            } else {
                in_criteria = false;
            }
            continue;
        }
        // The first prose paragraph after the heading is the canonical
        // statement; it runs until the next blank line.
        if !trimmed.starts_with('-') && !trimmed.starts_with("**") {
            if current.statement.is_empty() {
                current.statement = trimmed.to_string();
                in_statement = true;
            } else if in_statement {
                current.statement.push(' ');
                current.statement.push_str(trimmed);
            }
        }
    }

    for req in &mut out {
        req.pattern = ears::detect(&req.statement);
    }
    out
}

/// Parse and record the source path on every requirement.
pub fn parse_with_source(content: &str, source: &str) -> Vec<Requirement> {
    let mut reqs = parse(content);
    for r in &mut reqs {
        r.source = Some(source.to_string());
    }
    reqs
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
# Checkout Requirements

## Functional Requirements

### REQ-CHECKOUT-001: Persist submitted orders

WHEN the user submits the order, THEN the cart SHALL persist it.

**Acceptance Criteria:**
- [ ] idempotent
- [ ] completes within one second

### REQ-CHECKOUT-002: Validate totals

The cart SHALL validate order totals.

Some trailing prose that is not part of any block.
";

    #[test]
    fn parses_blocks_in_order() {
        let reqs = parse(DOC);
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].id, "REQ-CHECKOUT-001");
        assert_eq!(reqs[0].title, "Persist submitted orders");
        assert_eq!(
            reqs[0].statement,
            "WHEN the user submits the order, THEN the cart SHALL persist it."
        );
        assert_eq!(reqs[0].pattern, EarsPattern::Event);
        assert_eq!(reqs[0].acceptance_criteria.len(), 2);
        assert_eq!(reqs[1].pattern, EarsPattern::Ubiquitous);
    }

    #[test]
    fn statement_is_first_paragraph_only() {
        let reqs = parse(DOC);
        assert_eq!(reqs[1].statement, "The cart SHALL validate order totals.");
    }

    #[test]
    fn wrapped_statement_joins_continuation_lines() {
        let doc = "\
### REQ-CHECKOUT-003: Wrapped statement

WHEN the user submits the order,
THEN the cart SHALL persist it.

Trailing paragraph is not part of the statement.
";
        let reqs = parse(doc);
        assert_eq!(
            reqs[0].statement,
            "WHEN the user submits the order, THEN the cart SHALL persist it."
        );
        assert_eq!(reqs[0].pattern, EarsPattern::Event);
    }

    #[test]
    fn malformed_document_yields_empty() {
        assert!(parse("just some prose\nwith no headings").is_empty());
        assert!(parse("").is_empty());
    }

    #[test]
    fn commented_out_blocks_are_skipped() {
        let doc = "<!--\n### REQ-X-001: Hidden\n\nThe x SHALL y.\n-->\n";
        assert!(parse(doc).is_empty());
    }

    #[test]
    fn source_is_attached() {
        let reqs = parse_with_source(DOC, "docs/requirements/checkout.md");
        assert_eq!(reqs[0].source.as_deref(), Some("docs/requirements/checkout.md"));
    }
}
