//! Pipeline failure taxonomy

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::tool::ToolError;

/// Why a request could not be answered
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Request body failed validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Requested index file is not in the data directory
    #[error("Index file not found: {}", .0.display())]
    IndexNotFound(PathBuf),

    /// `vg chunk | vg view` failed or left no graph dump behind
    #[error("Region extraction failed: {0}")]
    ExtractionFailed(String),

    /// An external invocation hit the time bound and was killed
    #[error("{stage} timed out after {}s", after.as_secs())]
    ExtractionTimeout { stage: &'static str, after: Duration },

    /// No single `*annotate.txt` in the request directory
    #[error("Annotation file not found: {0}")]
    AnnotationNotFound(String),

    /// No single `*gam` in the request directory
    #[error("Alignment file not found: {0}")]
    AlignmentFileNotFound(String),

    /// `vg view -a` failed or left no JSON intermediate behind
    #[error("Alignment conversion failed: {0}")]
    AlignmentConversionFailed(String),

    /// `vg paths` failed
    #[error("Path listing failed: {0}")]
    PathListingFailed(String),

    /// Reading a file or directory failed
    #[error(transparent)]
    Io(#[from] tubemap_common::Error),

    /// A line of tool output could not be parsed
    #[error("Malformed line {line} in {}: {message}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl PipelineError {
    /// Machine-readable error kind reported to the caller
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::InvalidRequest(_) => "INVALID_REQUEST",
            PipelineError::IndexNotFound(_) => "INDEX_NOT_FOUND",
            PipelineError::ExtractionFailed(_) => "EXTRACTION_FAILED",
            PipelineError::ExtractionTimeout { .. } => "EXTRACTION_TIMEOUT",
            PipelineError::AnnotationNotFound(_) => "ANNOTATION_NOT_FOUND",
            PipelineError::AlignmentFileNotFound(_) => "ALIGNMENT_FILE_NOT_FOUND",
            PipelineError::AlignmentConversionFailed(_) => "ALIGNMENT_CONVERSION_FAILED",
            PipelineError::PathListingFailed(_) => "PATH_LISTING_FAILED",
            PipelineError::Io(_) | PipelineError::Malformed { .. } => "IO_FAILURE",
        }
    }

    /// Map a tool failure, keeping timeouts distinct from other failures
    pub(crate) fn from_tool(
        stage: &'static str,
        err: ToolError,
        otherwise: fn(String) -> PipelineError,
    ) -> Self {
        match err {
            ToolError::TimedOut { after, .. } => PipelineError::ExtractionTimeout { stage, after },
            other => otherwise(other.to_string()),
        }
    }
}
