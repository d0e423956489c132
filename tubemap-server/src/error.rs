//! HTTP error responses
//!
//! Every failure leaves as a non-2xx status with a body of the form
//! `{"error": {"code": "<KIND>", "message": "..."}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::PipelineError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Region extraction or path listing failure
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Catalog directory could not be read
    #[error(transparent)]
    Common(#[from] tubemap_common::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Pipeline(err) => match err {
                PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                PipelineError::IndexNotFound(_) => StatusCode::NOT_FOUND,
                PipelineError::ExtractionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                PipelineError::ExtractionFailed(_)
                | PipelineError::AnnotationNotFound(_)
                | PipelineError::AlignmentFileNotFound(_)
                | PipelineError::AlignmentConversionFailed(_)
                | PipelineError::PathListingFailed(_) => StatusCode::BAD_GATEWAY,
                PipelineError::Io(_) | PipelineError::Malformed { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Pipeline(err) => err.code(),
            ApiError::Common(_) => "IO_FAILURE",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PipelineError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (PipelineError::IndexNotFound("a.xg".into()), StatusCode::NOT_FOUND),
            (PipelineError::AnnotationNotFound("x".into()), StatusCode::BAD_GATEWAY),
            (
                PipelineError::ExtractionTimeout {
                    stage: "vg chunk",
                    after: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_directory_errors_are_server_errors() {
        let err = ApiError::from(tubemap_common::Error::io(
            "/missing",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "IO_FAILURE");
    }
}
