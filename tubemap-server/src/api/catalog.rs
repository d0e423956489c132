//! Catalog and path name endpoints

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use tracing::info;

use super::json_body;
use crate::catalog::{CatalogListing, PathNameListing};
use crate::error::ApiResult;
use crate::pipeline::flag;
use crate::AppState;

/// JSON body of `POST /listPathNames`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathNamesBody {
    pub xg_file: String,

    /// Defaults to the mounted directory
    #[serde(default = "default_use_mounted", deserialize_with = "flag")]
    pub use_mounted_path: bool,
}

fn default_use_mounted() -> bool {
    true
}

/// POST /listCatalog
///
/// Any request body is ignored.
pub async fn list_catalog(State(state): State<AppState>) -> ApiResult<Json<CatalogListing>> {
    info!("Catalog listing requested");
    let listing = state.catalog.list_indices().await?;
    info!(
        xg_files = listing.xg_files.len(),
        gam_indices = listing.gam_indices.len(),
        "Catalog listed"
    );
    Ok(Json(listing))
}

/// POST /listPathNames
pub async fn list_path_names(
    State(state): State<AppState>,
    payload: Result<Json<PathNamesBody>, JsonRejection>,
) -> ApiResult<Json<PathNameListing>> {
    let body = json_body(payload)?;
    info!(xg_file = %body.xg_file, "Path names requested");

    let listing = state
        .catalog
        .list_path_names(&body.xg_file, body.use_mounted_path)
        .await?;
    Ok(Json(listing))
}
