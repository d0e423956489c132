//! Region extraction endpoint

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::info;

use super::json_body;
use crate::error::ApiResult;
use crate::model::RegionResponse;
use crate::pipeline::ExtractRegionBody;
use crate::AppState;

/// POST /extractRegion
///
/// Runs the whole extraction pipeline and answers only once the graph is
/// fully merged. Every failure is reported with a non-2xx status and an
/// error code; the request's working directory is removed either way.
pub async fn extract_region(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRegionBody>, JsonRejection>,
) -> ApiResult<Json<RegionResponse>> {
    let body = json_body(payload)?;
    info!(
        node_id = %body.node_id,
        distance = %body.distance,
        xg_file = %body.xg_file,
        "Region extraction requested"
    );

    let response = state.pipeline.extract(body).await?;
    Ok(Json(response))
}
