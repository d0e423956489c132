//! HTTP API handlers

pub mod catalog;
pub mod health;
pub mod region;

pub use catalog::{list_catalog, list_path_names};
pub use health::health_routes;
pub use region::extract_region;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::{ApiError, ApiResult};
use crate::pipeline::PipelineError;

/// Unwrap a JSON body, reporting malformed input in the API error format
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::from(PipelineError::InvalidRequest(rejection.body_text())))
}
