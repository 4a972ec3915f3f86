//! API error type and its HTTP mapping.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use survey_core::SurveyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] SurveyError),

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Domain(SurveyError::invalid_argument("body", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Domain(SurveyError::invalid_argument("id", rejection.body_text()))
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Domain(SurveyError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Domain(SurveyError::InvalidArgument { .. }) => StatusCode::BAD_REQUEST,
            Self::Domain(SurveyError::InvalidState(_) | SurveyError::Conflict(_)) => {
                StatusCode::CONFLICT
            }
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Domain(err) => err.code(),
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Domain(err) => err.to_string(),
            Self::Storage(err) => {
                tracing::error!("Storage failure: {:#}", err);
                "internal storage error".to_string()
            }
        };
        let body = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_http_statuses() {
        let cases = [
            (SurveyError::not_found("drone", "x"), StatusCode::NOT_FOUND),
            (
                SurveyError::invalid_argument("planned_path", "too short"),
                StatusCode::BAD_REQUEST,
            ),
            (SurveyError::InvalidState("done".into()), StatusCode::CONFLICT),
            (SurveyError::Conflict("busy".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }

        let storage = ApiError::from(anyhow::anyhow!("disk full"));
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(storage.error_code(), "STORAGE_ERROR");
    }
}
