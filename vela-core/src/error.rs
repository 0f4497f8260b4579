//! Error types for template construction
//!
//! Every failure identifies the offending name. Construction fails fast:
//! the document is left unchanged when an `add_*` call errors, so a partial
//! document is never emitted.

/// Template construction error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TemplateError {
    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),

    #[error("duplicate condition '{0}'")]
    DuplicateCondition(String),

    #[error("duplicate logical name '{0}'")]
    DuplicateLogicalName(String),

    #[error("invalid logical name '{0}': must be non-empty and alphanumeric")]
    InvalidLogicalName(String),

    #[error("invalid allowed pattern for parameter '{name}': {reason}")]
    InvalidAllowedPattern { name: String, reason: String },

    #[error("unresolved reference '{target}' in '{referrer}'")]
    UnresolvedReference { referrer: String, target: String },

    #[error("unknown condition '{condition}' referenced by '{referrer}'")]
    UnknownCondition { referrer: String, condition: String },
}
