use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use polars::prelude::PolarsError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    UnsupportedFormat(String),
    #[error("Uploaded file is empty")]
    EmptyInput,
    #[error("Error processing file: {0}")]
    ParseFailure(String),
    #[error("Error analyzing data: {0}")]
    AnalysisFailure(String),
    #[error("Database error: {0}")]
    PersistenceFailure(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_)
            | AppError::UnsupportedFormat(_)
            | AppError::EmptyInput
            | AppError::ParseFailure(_) => StatusCode::BAD_REQUEST,
            AppError::AnalysisFailure(_)
            | AppError::PersistenceFailure(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::PersistenceFailure(err.to_string())
    }
}

impl From<PolarsError> for AppError {
    fn from(err: PolarsError) -> Self {
        AppError::AnalysisFailure(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "detail": self.to_string()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::EmptyInput.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::UnsupportedFormat("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::PersistenceFailure("locked".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            AppError::UnsupportedFormat("File must be a CSV or Excel file (.xlsx, .xls)".into()).to_string(),
            "File must be a CSV or Excel file (.xlsx, .xls)"
        );
        assert_eq!(
            AppError::ParseFailure("bad row".into()).to_string(),
            "Error processing file: bad row"
        );
    }
}
