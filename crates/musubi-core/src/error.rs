use thiserror::Error;

#[derive(Debug, Error)]
pub enum MusubiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("section '{section}' not found in {path}")]
    SectionMissing { section: String, path: String },

    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("invalid EARS statement: {0}")]
    InvalidEars(String),

    #[error("invalid task field {field}: {reason}")]
    InvalidTaskField { field: String, reason: String },

    #[error("circular dependency involving {0}")]
    CircularDependency(String),

    #[error("no template registered for artifact kind '{0}'")]
    TemplateMissing(String),

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("change apply hook failed for {classification} {id}: {reason}")]
    ApplyFailed {
        classification: String,
        id: String,
        reason: String,
    },

    #[error("validation failed: {0} violation(s)")]
    ValidationFailed(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MusubiError>;
