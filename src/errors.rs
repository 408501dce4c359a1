use crate::services::coordinator::SubmissionError;
use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::FormRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Everything a handler can fail with, as seen by the client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("attachment `{0}` not found")]
    AttachmentNotFound(String),

    /// The request body could not be read as a submission.
    #[error("{message}")]
    BadSubmission { status: StatusCode, message: String },

    /// A backing store failed mid-request. The cause is logged, never returned.
    #[error("store request failed")]
    Store(#[source] SubmissionError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AttachmentNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadSubmission { status, .. } => *status,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Store(cause) = &self {
            tracing::error!(error = %cause, "store request failed");
        }
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::AttachmentNotFound(name) => AppError::AttachmentNotFound(name),
            other => AppError::Store(other),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadSubmission {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::BadSubmission {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::BadSubmission {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}
