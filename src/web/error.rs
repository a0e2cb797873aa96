use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::warn;
use serde_json::json;

use crate::database::DatabaseError;
use crate::detect::DetectError;
use crate::export::ExportError;
use crate::search::SearchError;
use crate::spectrum::SpectrumError;

/// Request failure, mapped onto an HTTP status
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request named something that does not exist or carried a bad value
    #[error("{0}")]
    BadRequest(String),

    /// The requested record does not exist
    #[error("{0}")]
    NotFound(String),

    /// Anything else
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code used in JSON bodies
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "invalid_request",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Returns true for errors the client can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AppError::Internal(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("request failed ({}): {}", status, self);
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        if err.is_invalid_request() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        if err.is_invalid_request() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<SpectrumError> for AppError {
    fn from(err: SpectrumError) -> Self {
        match err {
            SpectrumError::NotFound(_) => AppError::NotFound(err.to_string()),
            SpectrumError::InvalidParameter(_) => AppError::BadRequest(err.to_string()),
            SpectrumError::Database(db) => db.into(),
            SpectrumError::Malformed { .. } => AppError::Internal(err.to_string()),
        }
    }
}

impl From<DetectError> for AppError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::InvalidParameter(_) => AppError::BadRequest(err.to_string()),
            DetectError::NoLibrary(_) => AppError::NotFound(err.to_string()),
            DetectError::Spectrum(e) => e.into(),
            DetectError::Database(e) => e.into(),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("background task failed: {}", err))
    }
}
