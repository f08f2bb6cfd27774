use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ArtifactKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Requirements,
    Design,
    Tasks,
    Changes,
}

impl ArtifactKind {
    pub fn all() -> &'static [ArtifactKind] {
        &[
            ArtifactKind::Requirements,
            ArtifactKind::Design,
            ArtifactKind::Tasks,
            ArtifactKind::Changes,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Requirements => "requirements",
            ArtifactKind::Design => "design",
            ArtifactKind::Tasks => "tasks",
            ArtifactKind::Changes => "changes",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = crate::error::MusubiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requirements" => Ok(ArtifactKind::Requirements),
            "design" => Ok(ArtifactKind::Design),
            "tasks" => Ok(ArtifactKind::Tasks),
            "changes" => Ok(ArtifactKind::Changes),
            _ => Err(crate::error::MusubiError::NotFound(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// EarsPattern
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarsPattern {
    Ubiquitous,
    Event,
    State,
    Unwanted,
    Optional,
    Unknown,
}

impl EarsPattern {
    pub fn all() -> &'static [EarsPattern] {
        &[
            EarsPattern::Ubiquitous,
            EarsPattern::Event,
            EarsPattern::State,
            EarsPattern::Unwanted,
            EarsPattern::Optional,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EarsPattern::Ubiquitous => "ubiquitous",
            EarsPattern::Event => "event",
            EarsPattern::State => "state",
            EarsPattern::Unwanted => "unwanted",
            EarsPattern::Optional => "optional",
            EarsPattern::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EarsPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EarsPattern {
    type Err = crate::error::MusubiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ubiquitous" => Ok(EarsPattern::Ubiquitous),
            "event" => Ok(EarsPattern::Event),
            "state" => Ok(EarsPattern::State),
            "unwanted" => Ok(EarsPattern::Unwanted),
            "optional" => Ok(EarsPattern::Optional),
            "unknown" => Ok(EarsPattern::Unknown),
            _ => Err(crate::error::MusubiError::InvalidEars(format!(
                "unknown pattern '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    pub fn all() -> &'static [Priority] {
        &[Priority::P0, Priority::P1, Priority::P2, Priority::P3]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        }
    }

    /// Section heading a task of this priority is filed under. P3 tasks are
    /// filed under the P2 section by convention.
    pub fn section(self) -> &'static str {
        match self {
            Priority::P0 => "P0 Tasks",
            Priority::P1 => "P1 Tasks",
            Priority::P2 | Priority::P3 => "P2 Tasks",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = crate::error::MusubiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "P0" | "p0" => Ok(Priority::P0),
            "P1" | "p1" => Ok(Priority::P1),
            "P2" | "p2" => Ok(Priority::P2),
            "P3" | "p3" => Ok(Priority::P3),
            _ => Err(crate::error::MusubiError::InvalidTaskField {
                field: "priority".to_string(),
                reason: format!("'{s}' is not one of P0..P3"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = crate::error::MusubiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "pending" | "not_started" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            _ => Err(crate::error::MusubiError::InvalidTaskField {
                field: "status".to_string(),
                reason: format!("unknown status '{s}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// AdrStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdrStatus {
    Proposed,
    Accepted,
    Rejected,
    Deprecated,
}

impl AdrStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AdrStatus::Proposed => "proposed",
            AdrStatus::Accepted => "accepted",
            AdrStatus::Rejected => "rejected",
            AdrStatus::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for AdrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdrStatus {
    type Err = crate::error::MusubiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "proposed" => Ok(AdrStatus::Proposed),
            "accepted" => Ok(AdrStatus::Accepted),
            "rejected" => Ok(AdrStatus::Rejected),
            "deprecated" => Ok(AdrStatus::Deprecated),
            _ => Err(crate::error::MusubiError::NotFound(format!(
                "ADR status '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// DeltaKind
// ---------------------------------------------------------------------------

/// Classification of one item in a change delta. Serialized in the
/// SCREAMING form used inside delta documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeltaKind {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl DeltaKind {
    /// Apply order within a single change: ADDED -> MODIFIED -> REMOVED -> RENAMED.
    pub fn all() -> &'static [DeltaKind] {
        &[
            DeltaKind::Added,
            DeltaKind::Modified,
            DeltaKind::Removed,
            DeltaKind::Renamed,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeltaKind::Added => "ADDED",
            DeltaKind::Modified => "MODIFIED",
            DeltaKind::Removed => "REMOVED",
            DeltaKind::Renamed => "RENAMED",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            DeltaKind::Added => "Added Requirements",
            DeltaKind::Modified => "Modified Requirements",
            DeltaKind::Removed => "Removed Requirements",
            DeltaKind::Renamed => "Renamed Requirements",
        }
    }
}

impl fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeltaKind {
    type Err = crate::error::MusubiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADDED" => Ok(DeltaKind::Added),
            "MODIFIED" => Ok(DeltaKind::Modified),
            "REMOVED" => Ok(DeltaKind::Removed),
            "RENAMED" => Ok(DeltaKind::Renamed),
            _ => Err(crate::error::MusubiError::NotFound(format!(
                "delta classification '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Severity / ImpactCategory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactCategory {
    Requirements,
    Design,
    Code,
    Tests,
    Documentation,
    Configuration,
}

impl ImpactCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ImpactCategory::Requirements => "requirements",
            ImpactCategory::Design => "design",
            ImpactCategory::Code => "code",
            ImpactCategory::Tests => "tests",
            ImpactCategory::Documentation => "documentation",
            ImpactCategory::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ImpactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BudgetPeriod
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl BudgetPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            BudgetPeriod::Daily => "daily",
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
        }
    }
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BudgetPeriod {
    type Err = crate::error::MusubiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(BudgetPeriod::Daily),
            "weekly" => Ok(BudgetPeriod::Weekly),
            "monthly" => Ok(BudgetPeriod::Monthly),
            _ => Err(crate::error::MusubiError::NotFound(format!(
                "budget period '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn artifact_kind_roundtrip() {
        for &kind in ArtifactKind::all() {
            let parsed = ArtifactKind::from_str(kind.as_str()).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn priority_ordering() {
        assert!(Priority::P0 < Priority::P1);
        assert!(Priority::P2 < Priority::P3);
    }

    #[test]
    fn priority_p3_files_under_p2_section() {
        assert_eq!(Priority::P3.section(), "P2 Tasks");
        assert_eq!(Priority::P0.section(), "P0 Tasks");
    }

    #[test]
    fn delta_kind_apply_order() {
        assert_eq!(
            DeltaKind::all(),
            &[
                DeltaKind::Added,
                DeltaKind::Modified,
                DeltaKind::Removed,
                DeltaKind::Renamed
            ]
        );
    }

    #[test]
    fn delta_kind_parses_case_insensitive() {
        assert_eq!(DeltaKind::from_str("added").unwrap(), DeltaKind::Added);
        assert_eq!(DeltaKind::from_str("REMOVED").unwrap(), DeltaKind::Removed);
        assert!(DeltaKind::from_str("replaced").is_err());
    }

    #[test]
    fn ears_pattern_all_excludes_unknown() {
        assert_eq!(EarsPattern::all().len(), 5);
        assert!(!EarsPattern::all().contains(&EarsPattern::Unknown));
    }

    #[test]
    fn task_status_aliases() {
        assert_eq!(TaskStatus::from_str("Not Started").unwrap(), TaskStatus::Pending);
        assert_eq!(TaskStatus::from_str("In Progress").unwrap(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::from_str("done").unwrap(), TaskStatus::Completed);
    }

    #[test]
    fn severity_serde_snake_case() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }

    #[test]
    fn delta_kind_serde_screaming() {
        let json = serde_json::to_string(&DeltaKind::Renamed).unwrap();
        assert_eq!(json, "\"RENAMED\"");
    }
}
