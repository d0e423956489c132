//! tubemap-server library
//!
//! Backend of the sequence tube map viewer: extracts a sub-region of a
//! reference graph with `vg`, enriches its paths with haplotype frequencies
//! and region offsets, and returns it (optionally with the aligned reads)
//! as one JSON document.

use std::sync::Arc;

use axum::http::header::{HeaderName, ACCEPT, CONTENT_TYPE, ORIGIN};
use axum::http::Method;
use axum::Router;
use tokio::sync::Semaphore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tubemap_common::config::TomlConfig;

pub mod api;
pub mod catalog;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod tool;

pub use crate::error::{ApiError, ApiResult};

use crate::catalog::Catalog;
use crate::pipeline::{DataDirs, ExtractionPipeline};
use crate::tool::VgTool;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Region extraction pipeline
    pub pipeline: Arc<ExtractionPipeline>,
    /// Index and path name listing
    pub catalog: Arc<Catalog>,
}

impl AppState {
    /// Wire the pipeline and catalog from configuration
    ///
    /// Extraction and path listing share one limit on concurrently running
    /// tool invocations.
    pub fn from_config(config: &TomlConfig) -> Self {
        let tool = VgTool::new(&config.vg_path, config.tool_timeout());
        let data_dirs = DataDirs {
            mounted: config.mounted_data_dir.clone(),
            internal: config.internal_data_dir.clone(),
        };
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_jobs));

        Self {
            pipeline: Arc::new(ExtractionPipeline::new(
                tool.clone(),
                data_dirs.clone(),
                config.work_dir.clone(),
                Arc::clone(&limiter),
            )),
            catalog: Arc::new(Catalog::new(tool, data_dirs, config.work_dir.clone(), limiter)),
        }
    }
}

/// Build application router
///
/// The legacy route names used by existing tube map front ends are kept as
/// aliases.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::post;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            ORIGIN,
            HeaderName::from_static("x-requested-with"),
            CONTENT_TYPE,
            ACCEPT,
        ]);

    Router::new()
        .route("/extractRegion", post(api::extract_region))
        .route("/listCatalog", post(api::list_catalog))
        .route("/listPathNames", post(api::list_path_names))
        // Legacy aliases
        .route("/chr22_v4", post(api::extract_region))
        .route("/getFilenames", post(api::list_catalog))
        .route("/getPathNames", post(api::list_path_names))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
