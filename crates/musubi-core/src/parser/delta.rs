use crate::id::req_scan_re;
use crate::types::DeltaKind;
use serde::{Deserialize, Serialize};

use super::{bullet_text, strip_comments};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaItem {
    pub kind: DeltaKind,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New identifier for RENAMED items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaDocument {
    pub change_id: String,
    pub items: Vec<DeltaItem>,
}

impl DeltaDocument {
    pub fn of_kind(&self, kind: DeltaKind) -> impl Iterator<Item = &DeltaItem> {
        self.items.iter().filter(move |i| i.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Parse a delta document. Under each classification sub-heading, bullet
/// lines of the form `- REQ-<COMP>-<NNN>: <optional title>` become items;
/// RENAMED bullets carry both the before and after ID
/// (`- REQ-A-001 -> REQ-A-002`). Unrecognized lines are skipped.
pub fn parse(change_id: &str, content: &str) -> DeltaDocument {
    let cleaned = strip_comments(content);
    let mut items = Vec::new();
    let mut current: Option<DeltaKind> = None;

    for line in cleaned.lines() {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix("### ") {
            current = DeltaKind::all()
                .iter()
                .copied()
                .find(|k| heading.eq_ignore_ascii_case(k.heading()) || heading.contains(k.as_str()));
            continue;
        }
        if trimmed.starts_with("## ") {
            current = None;
            continue;
        }
        let Some(kind) = current else { continue };
        let Some(text) = bullet_text(trimmed) else { continue };

        let ids: Vec<String> = req_scan_re()
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        let Some(target) = ids.first().cloned() else { continue };

        let renamed_to = if kind == DeltaKind::Renamed {
            ids.get(1).cloned()
        } else {
            None
        };
        let title = text
            .split_once(':')
            .map(|(_, t)| t.trim().to_string())
            .filter(|t| !t.is_empty() && !t.contains("REQ-"));

        items.push(DeltaItem {
            kind,
            target,
            title,
            renamed_to,
        });
    }

    DeltaDocument {
        change_id: change_id.to_string(),
        items,
    }
}
