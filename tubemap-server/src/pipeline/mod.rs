//! Region extraction pipeline
//!
//! One request runs these stages strictly in order, each one depending on
//! files written by the previous:
//!
//! ```text
//! Extracting -> Annotating -> [Aligning] -> RegionMerging -> CleaningUp -> Responded
//! ```
//!
//! Any stage failure jumps straight to `CleaningUp`. Cleanup runs on every
//! path and removes the request's whole working directory.

mod alignment;
mod annotation;
mod error;
mod region;
mod request;
mod workspace;

pub use alignment::read_alignment_records;
pub use annotation::{merge_annotation_file, AnnotationMerger, AnnotationSummary};
pub use error::PipelineError;
pub use region::{apply_region_line, merge_region_table};
pub(crate) use request::flag;
pub use request::{check_file_name, DataDirs, ExtractRegionBody, RegionRequest, NO_ALIGNMENT_INDEX};
pub use workspace::{ArtifactLookup, RequestWorkspace};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::model::{GraphDocument, RegionResponse};
use crate::tool::{ChunkSpec, VgTool};

/// Suffix of the haplotype annotation written by `vg chunk -T`
pub const ANNOTATION_SUFFIX: &str = "annotate.txt";
/// Suffix of the alignment chunk written by `vg chunk -g`
pub const ALIGNMENT_SUFFIX: &str = "gam";

/// Pipeline position, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Annotating,
    Aligning,
    RegionMerging,
    CleaningUp,
    Responded,
}

/// Runs region extractions, one working directory per request
pub struct ExtractionPipeline {
    tool: VgTool,
    data_dirs: DataDirs,
    work_root: PathBuf,
    limiter: Arc<Semaphore>,
}

impl ExtractionPipeline {
    pub fn new(tool: VgTool, data_dirs: DataDirs, work_root: PathBuf, limiter: Arc<Semaphore>) -> Self {
        Self {
            tool,
            data_dirs,
            work_root,
            limiter,
        }
    }

    /// Validate `body` and run the full pipeline for it
    pub async fn extract(&self, body: ExtractRegionBody) -> Result<RegionResponse, PipelineError> {
        let request = body.validate(&self.data_dirs)?;
        self.run(request).await
    }

    /// Run the full pipeline for an already validated request
    pub async fn run(&self, request: RegionRequest) -> Result<RegionResponse, PipelineError> {
        require_file(&request.xg_file).await?;
        if let Some(gam_index) = &request.gam_index {
            require_file(gam_index).await?;
        }

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| PipelineError::ExtractionFailed("job limiter closed".to_string()))?;

        let workspace = RequestWorkspace::create(&self.work_root).await?;
        let span = info_span!("extract_region", request_id = %workspace.id());

        async move {
            info!(
                xg_file = %request.xg_file.display(),
                with_alignments = request.with_alignments(),
                selection = ?request.selection,
                "Region extraction started"
            );

            let outcome = self.run_stages(&request, &workspace).await;

            debug!(stage = ?Stage::CleaningUp);
            workspace.release().await;

            match &outcome {
                Ok(response) => {
                    debug!(stage = ?Stage::Responded);
                    info!(
                        paths = response.graph.path.len(),
                        alignments = response.gam.len(),
                        "Region extraction finished"
                    );
                }
                Err(e) => warn!(kind = e.code(), "Region extraction failed: {}", e),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        request: &RegionRequest,
        workspace: &RequestWorkspace,
    ) -> Result<RegionResponse, PipelineError> {
        debug!(stage = ?Stage::Extracting);
        let mut graph = self.extract_graph(request, workspace).await?;

        debug!(stage = ?Stage::Annotating);
        let annotation = match workspace.find_artifact(ANNOTATION_SUFFIX).await? {
            ArtifactLookup::Found(path) => path,
            ArtifactLookup::Missing => {
                return Err(PipelineError::AnnotationNotFound(format!(
                    "no *{} produced",
                    ANNOTATION_SUFFIX
                )))
            }
            ArtifactLookup::Ambiguous(paths) => {
                return Err(PipelineError::AnnotationNotFound(format!(
                    "{} candidate *{} files",
                    paths.len(),
                    ANNOTATION_SUFFIX
                )))
            }
        };
        merge_annotation_file(&mut graph.path, &annotation).await?;

        let gam = if request.with_alignments() {
            debug!(stage = ?Stage::Aligning);
            self.extract_alignments(workspace).await?
        } else {
            Vec::new()
        };

        debug!(stage = ?Stage::RegionMerging);
        merge_region_table(&mut graph.path, &workspace.region_table()).await?;

        Ok(RegionResponse { graph, gam })
    }

    /// Run `vg chunk | vg view` and parse the resulting graph dump
    async fn extract_graph(
        &self,
        request: &RegionRequest,
        workspace: &RequestWorkspace,
    ) -> Result<GraphDocument, PipelineError> {
        let spec = ChunkSpec {
            xg_file: absolute(&request.xg_file)?,
            gam_index: request.gam_index.as_deref().map(absolute).transpose()?,
            selection: request.selection.clone(),
            region_table: workspace.region_table(),
        };
        let graph_file = workspace.graph_file();

        self.tool
            .extract_region(&spec, workspace.dir(), &graph_file)
            .await
            .map_err(|e| PipelineError::from_tool("vg chunk", e, PipelineError::ExtractionFailed))?;

        if !file_exists(&graph_file).await {
            return Err(PipelineError::ExtractionFailed(format!(
                "{} missing after vg exited",
                graph_file.display()
            )));
        }
        if !file_exists(&spec.region_table).await {
            return Err(PipelineError::ExtractionFailed(format!(
                "{} missing after vg exited",
                spec.region_table.display()
            )));
        }

        let raw = tokio::fs::read(&graph_file)
            .await
            .map_err(|e| tubemap_common::Error::io(&graph_file, e))?;
        serde_json::from_slice(&raw).map_err(|e| PipelineError::Malformed {
            path: graph_file,
            line: e.line(),
            message: e.to_string(),
        })
    }

    /// Convert the alignment chunk to JSON and read it back
    async fn extract_alignments(&self, workspace: &RequestWorkspace) -> Result<Vec<Value>, PipelineError> {
        let gam_file = match workspace.find_artifact(ALIGNMENT_SUFFIX).await? {
            ArtifactLookup::Found(path) => path,
            ArtifactLookup::Missing => {
                return Err(PipelineError::AlignmentFileNotFound(format!(
                    "no *{} produced",
                    ALIGNMENT_SUFFIX
                )))
            }
            ArtifactLookup::Ambiguous(paths) => {
                return Err(PipelineError::AlignmentFileNotFound(format!(
                    "{} candidate *{} files",
                    paths.len(),
                    ALIGNMENT_SUFFIX
                )))
            }
        };
        let out = workspace.alignment_json();

        self.tool
            .convert_alignments(&gam_file, workspace.dir(), &out)
            .await
            .map_err(|e| PipelineError::from_tool("vg view", e, PipelineError::AlignmentConversionFailed))?;

        if !file_exists(&out).await {
            return Err(PipelineError::AlignmentConversionFailed(format!(
                "{} missing after vg exited",
                out.display()
            )));
        }

        read_alignment_records(&out).await
    }
}

/// Fail with `IndexNotFound` unless `path` is an existing file
pub(crate) async fn require_file(path: &Path) -> Result<(), PipelineError> {
    if file_exists(path).await {
        Ok(())
    } else {
        Err(PipelineError::IndexNotFound(path.to_path_buf()))
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// The tool runs inside the request directory, so inputs need absolute paths
pub(crate) fn absolute(path: &Path) -> Result<PathBuf, PipelineError> {
    Ok(absolute_path(path)?)
}

fn absolute_path(path: &Path) -> tubemap_common::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| tubemap_common::Error::io(".", e))?;
    Ok(cwd.join(path))
}
