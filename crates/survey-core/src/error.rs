//! Error taxonomy shared by the lifecycle and telemetry logic.

use thiserror::Error;

/// Business-rule failures raised by the core.
///
/// None of these are transient: retrying the same request yields the same
/// error, so callers surface them instead of retrying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurveyError {
    #[error("resource not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid {field}: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl SurveyError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Conflict(_) => "CONFLICT",
        }
    }
}

pub type SurveyResult<T> = Result<T, SurveyError>;
