use crate::error::{MusubiError, Result};
use crate::types::EarsPattern;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Classify a statement by its recognition prefix. Detection is purely
/// prefix-based; structural problems are reported by `validate`, not here.
pub fn detect(statement: &str) -> EarsPattern {
    let s = statement.trim_start();
    if s.starts_with("WHEN ") {
        EarsPattern::Event
    } else if s.starts_with("WHILE ") {
        EarsPattern::State
    } else if s.starts_with("IF ") {
        EarsPattern::Unwanted
    } else if s.starts_with("WHERE ") {
        EarsPattern::Optional
    } else if s.starts_with("The ") {
        EarsPattern::Ubiquitous
    } else {
        EarsPattern::Unknown
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarsValidation {
    pub pattern: EarsPattern,
    pub errors: Vec<String>,
}

impl EarsValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a statement against the structural invariants of its detected
/// pattern. Never fails; violations come back as error strings.
pub fn validate(statement: &str) -> EarsValidation {
    let s = statement.trim();
    let pattern = detect(s);
    let mut errors = Vec::new();

    let has_shall = s.contains("SHALL");
    match pattern {
        EarsPattern::Ubiquitous => {
            if !has_shall {
                errors.push("Missing SHALL keyword".to_string());
            }
        }
        EarsPattern::Event => {
            if !s.contains("THEN") {
                errors.push("Event pattern requires THEN after the trigger".to_string());
            }
            if !has_shall {
                errors.push("Missing SHALL keyword".to_string());
            }
        }
        EarsPattern::State => {
            if !has_shall {
                errors.push("Missing SHALL keyword".to_string());
            }
        }
        EarsPattern::Unwanted => {
            if !s.contains("THEN") {
                errors.push("Unwanted-behavior pattern requires THEN after the condition".to_string());
            }
            if !has_shall {
                errors.push("Missing SHALL keyword".to_string());
            }
        }
        EarsPattern::Optional => {
            if !has_shall {
                errors.push("Missing SHALL keyword".to_string());
            }
        }
        EarsPattern::Unknown => {
            errors.push(
                "Statement matches no EARS pattern (expected The/WHEN/WHILE/IF/WHERE prefix)"
                    .to_string(),
            );
        }
    }

    EarsValidation { pattern, errors }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Raw parts of a requirement statement. `clause` is the trigger (event),
/// condition (state), error condition (unwanted), or feature (optional);
/// unused for ubiquitous.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EarsParts {
    pub system: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clause: Option<String>,
}

impl EarsParts {
    pub fn new(system: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            response: response.into(),
            clause: None,
        }
    }

    pub fn with_clause(mut self, clause: impl Into<String>) -> Self {
        self.clause = Some(clause.into());
        self
    }
}

/// Produce the canonical statement for a pattern. Inverse of `validate` for
/// well-formed inputs: the generated statement always detects and validates
/// as the requested pattern.
pub fn compose(pattern: EarsPattern, parts: &EarsParts) -> Result<String> {
    if parts.system.is_empty() || parts.response.is_empty() {
        return Err(MusubiError::InvalidEars(
            "system and response must be non-empty".to_string(),
        ));
    }
    let clause = || {
        parts.clause.as_deref().filter(|c| !c.is_empty()).ok_or_else(|| {
            MusubiError::InvalidEars(format!("pattern '{pattern}' requires a clause"))
        })
    };

    let statement = match pattern {
        EarsPattern::Ubiquitous => {
            format!("The {} SHALL {}.", parts.system, parts.response)
        }
        EarsPattern::Event => format!(
            "WHEN {}, THEN the {} SHALL {}.",
            clause()?,
            parts.system,
            parts.response
        ),
        EarsPattern::State => format!(
            "WHILE {}, the {} SHALL {}.",
            clause()?,
            parts.system,
            parts.response
        ),
        EarsPattern::Unwanted => format!(
            "IF {}, THEN the {} SHALL {}.",
            clause()?,
            parts.system,
            parts.response
        ),
        EarsPattern::Optional => format!(
            "WHERE {}, the {} SHALL {}.",
            clause()?,
            parts.system,
            parts.response
        ),
        EarsPattern::Unknown => {
            return Err(MusubiError::InvalidEars(
                "cannot generate an unknown-pattern statement".to_string(),
            ))
        }
    };
    Ok(statement)
}

// ---------------------------------------------------------------------------
// Quality metrics (informational, no effect on validation outcome)
// ---------------------------------------------------------------------------

const AMBIGUOUS_MODALS: [&str; 4] = ["should", "could", "might", "may"];
const VAGUE_TERMS: [&str; 3] = ["etc", "as needed", "appropriate"];

const MIN_WORDS: usize = 5;
const MAX_WORDS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub total: usize,
    pub ambiguous: usize,
    pub vague: usize,
    pub too_short: usize,
    pub too_long: usize,
    pub score: u32,
    pub grade: char,
}

fn has_word(statement: &str, word: &str) -> bool {
    let lower = statement.to_lowercase();
    lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|w| w == word)
}

/// Score a set of statements against weak-language heuristics. Each flagged
/// statement counts once per metric.
pub fn quality(statements: &[&str]) -> QualityReport {
    let mut ambiguous = 0usize;
    let mut vague = 0usize;
    let mut too_short = 0usize;
    let mut too_long = 0usize;

    for s in statements {
        if AMBIGUOUS_MODALS.iter().any(|m| has_word(s, m)) {
            ambiguous += 1;
        }
        let lower = s.to_lowercase();
        // "etc" needs a word-boundary match; "fetches" is not vague.
        if has_word(s, "etc") || VAGUE_TERMS[1..].iter().any(|t| lower.contains(t)) {
            vague += 1;
        }
        let words = s.split_whitespace().count();
        if words < MIN_WORDS {
            too_short += 1;
        } else if words > MAX_WORDS {
            too_long += 1;
        }
    }

    let penalty = ambiguous * 10 + vague * 5 + (too_short + too_long) * 5;
    let score = 100u32.saturating_sub(penalty as u32);
    let grade = match score {
        90..=100 => 'A',
        80..=89 => 'B',
        70..=79 => 'C',
        60..=69 => 'D',
        _ => 'F',
    };

    QualityReport {
        total: statements.len(),
        ambiguous,
        vague,
        too_short,
        too_long,
        score,
        grade,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_by_prefix() {
        assert_eq!(detect("WHEN the user clicks, THEN the app SHALL respond."), EarsPattern::Event);
        assert_eq!(detect("WHILE idle, the app SHALL sleep."), EarsPattern::State);
        assert_eq!(detect("IF the disk is full, THEN the app SHALL abort."), EarsPattern::Unwanted);
        assert_eq!(detect("WHERE dark mode is enabled, the app SHALL dim."), EarsPattern::Optional);
        assert_eq!(detect("The app SHALL log in users."), EarsPattern::Ubiquitous);
        assert_eq!(detect("Users can log in."), EarsPattern::Unknown);
    }

    #[test]
    fn when_prefix_is_never_ubiquitous() {
        assert_ne!(detect("WHEN anything at all"), EarsPattern::Ubiquitous);
    }

    #[test]
    fn missing_shall_is_reported() {
        let v = validate("The system should validate inputs.");
        assert_eq!(v.pattern, EarsPattern::Ubiquitous);
        assert_eq!(v.errors, vec!["Missing SHALL keyword".to_string()]);
    }

    #[test]
    fn event_requires_then_and_shall() {
        let v = validate("WHEN the order arrives, the cart stores it.");
        assert_eq!(v.pattern, EarsPattern::Event);
        assert_eq!(v.errors.len(), 2);
    }

    #[test]
    fn compose_validate_roundtrip() {
        let cases = [
            (EarsPattern::Ubiquitous, EarsParts::new("cart", "persist orders")),
            (
                EarsPattern::Event,
                EarsParts::new("cart", "persist it").with_clause("the user submits the order"),
            ),
            (
                EarsPattern::State,
                EarsParts::new("scheduler", "defer new jobs").with_clause("the queue is full"),
            ),
            (
                EarsPattern::Unwanted,
                EarsParts::new("uploader", "retry three times").with_clause("the network drops"),
            ),
            (
                EarsPattern::Optional,
                EarsParts::new("viewer", "render thumbnails").with_clause("previews are enabled"),
            ),
        ];
        for (pattern, parts) in cases {
            let statement = compose(pattern, &parts).unwrap();
            let v = validate(&statement);
            assert_eq!(v.pattern, pattern, "statement: {statement}");
            assert!(v.is_valid(), "errors {:?} for {statement}", v.errors);
        }
    }

    #[test]
    fn compose_event_matches_scenario() {
        let parts = EarsParts::new("cart", "persist it").with_clause("the user submits the order");
        let statement = compose(EarsPattern::Event, &parts).unwrap();
        assert_eq!(
            statement,
            "WHEN the user submits the order, THEN the cart SHALL persist it."
        );
    }

    #[test]
    fn compose_rejects_missing_clause() {
        let parts = EarsParts::new("cart", "persist it");
        assert!(compose(EarsPattern::Event, &parts).is_err());
    }

    #[test]
    fn compose_rejects_unknown() {
        let parts = EarsParts::new("cart", "persist it");
        assert!(compose(EarsPattern::Unknown, &parts).is_err());
    }

    #[test]
    fn quality_flags_weak_language() {
        let report = quality(&[
            "The cart SHALL persist orders within one second.",
            "The cart should maybe store things etc.",
            "Too short.",
        ]);
        assert_eq!(report.total, 3);
        assert_eq!(report.ambiguous, 1);
        assert_eq!(report.vague, 1);
        assert_eq!(report.too_short, 1);
        assert_eq!(report.score, 100 - 10 - 5 - 5);
        assert_eq!(report.grade, 'B');
    }

    #[test]
    fn quality_perfect_set_is_grade_a() {
        let report = quality(&["The cart SHALL persist orders within one second."]);
        assert_eq!(report.score, 100);
        assert_eq!(report.grade, 'A');
    }

    #[test]
    fn quality_modal_matches_whole_words_only() {
        // "display" contains "may" as a substring but is not a modal.
        let report = quality(&["The panel SHALL display the current totals."]);
        assert_eq!(report.ambiguous, 0);
    }
}
