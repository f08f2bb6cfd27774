use crate::error::{MusubiError, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Identifier grammar
// ---------------------------------------------------------------------------
//
//   REQ-ID  := "REQ-" [A-Z0-9]+ "-" [0-9]{3}
//   ADR-ID  := "ADR-" [0-9]{3}
//   TASK-ID := "TASK-" [0-9]{3}

static REQ_RE: OnceLock<Regex> = OnceLock::new();
static ADR_RE: OnceLock<Regex> = OnceLock::new();
static TASK_RE: OnceLock<Regex> = OnceLock::new();

pub fn req_id_re() -> &'static Regex {
    REQ_RE.get_or_init(|| Regex::new(r"^REQ-([A-Z0-9]+)-(\d{3})$").unwrap())
}

pub fn adr_id_re() -> &'static Regex {
    ADR_RE.get_or_init(|| Regex::new(r"^ADR-(\d{3})$").unwrap())
}

pub fn task_id_re() -> &'static Regex {
    TASK_RE.get_or_init(|| Regex::new(r"^TASK-(\d{3})$").unwrap())
}

/// Unanchored scan pattern for requirement IDs embedded in prose or code.
pub fn req_scan_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"REQ-[A-Z0-9]+-\d{3}").unwrap())
}

// ---------------------------------------------------------------------------
// ReqId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReqId {
    pub component: String,
    pub number: u32,
}

impl ReqId {
    pub fn new(component: impl Into<String>, number: u32) -> Self {
        Self {
            component: component.into(),
            number,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let caps = req_id_re()
            .captures(s)
            .ok_or_else(|| MusubiError::InvalidIdentifier(s.to_string()))?;
        Ok(Self {
            component: caps[1].to_string(),
            number: caps[2].parse().expect("three digits"),
        })
    }

    /// Uppercase a component name for use inside a requirement ID, stripping
    /// anything outside [A-Z0-9].
    pub fn component_from(name: &str) -> String {
        name.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }
}

impl fmt::Display for ReqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REQ-{}-{:03}", self.component, self.number)
    }
}

// ---------------------------------------------------------------------------
// AdrId / TaskId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdrId(pub u32);

impl AdrId {
    pub fn parse(s: &str) -> Result<Self> {
        let caps = adr_id_re()
            .captures(s)
            .ok_or_else(|| MusubiError::InvalidIdentifier(s.to_string()))?;
        Ok(Self(caps[1].parse().expect("three digits")))
    }
}

impl fmt::Display for AdrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ADR-{:03}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u32);

impl TaskId {
    pub fn parse(s: &str) -> Result<Self> {
        let caps = task_id_re()
            .captures(s)
            .ok_or_else(|| MusubiError::InvalidIdentifier(s.to_string()))?;
        Ok(Self(caps[1].parse().expect("three digits")))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TASK-{:03}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

/// Next requirement counter within one component namespace: one past the
/// highest number already present, starting at 1.
pub fn next_req_number<'a>(existing: impl IntoIterator<Item = &'a ReqId>, component: &str) -> u32 {
    existing
        .into_iter()
        .filter(|id| id.component == component)
        .map(|id| id.number)
        .max()
        .unwrap_or(0)
        + 1
}

pub fn next_adr_number<'a>(existing: impl IntoIterator<Item = &'a AdrId>) -> u32 {
    existing.into_iter().map(|id| id.0).max().unwrap_or(0) + 1
}

pub fn next_task_number<'a>(existing: impl IntoIterator<Item = &'a TaskId>) -> u32 {
    existing.into_iter().map(|id| id.0).max().unwrap_or(0) + 1
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
