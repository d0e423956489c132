//! Reference-data catalog and path name listing
//!
//! Both are read-only with respect to the data directories. Path name
//! listing runs `vg paths` in its own request workspace, like the
//! extraction pipeline does.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, info_span, Instrument};
use tubemap_common::{listing, LineReader};

use crate::pipeline::{self, check_file_name, DataDirs, PipelineError, RequestWorkspace};
use crate::tool::VgTool;

/// Suffix of graph index files
pub const GRAPH_INDEX_SUFFIX: &str = "xg";
/// Suffix of alignment index files
pub const ALIGNMENT_INDEX_SUFFIX: &str = "gam.index";

/// Index files available for extraction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogListing {
    pub xg_files: Vec<String>,
    pub gam_indices: Vec<String>,
}

/// Path names of one graph index, in tool order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathNameListing {
    pub path_names: Vec<String>,
}

/// Read-only view of the reference-data directories
pub struct Catalog {
    tool: VgTool,
    data_dirs: DataDirs,
    work_root: PathBuf,
    limiter: Arc<Semaphore>,
}

impl Catalog {
    pub fn new(tool: VgTool, data_dirs: DataDirs, work_root: PathBuf, limiter: Arc<Semaphore>) -> Self {
        Self {
            tool,
            data_dirs,
            work_root,
            limiter,
        }
    }

    /// Graph and alignment indices in the mounted data directory
    pub async fn list_indices(&self) -> tubemap_common::Result<CatalogListing> {
        list_indices_in(&self.data_dirs.mounted).await
    }

    /// Path names of `xg_file`, read from the mounted or internal directory
    pub async fn list_path_names(
        &self,
        xg_file: &str,
        use_mounted: bool,
    ) -> Result<PathNameListing, PipelineError> {
        check_file_name("xgFile", xg_file)?;
        let xg_path = pipeline::absolute(&self.data_dirs.select(use_mounted).join(xg_file))?;
        pipeline::require_file(&xg_path).await?;

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| PipelineError::PathListingFailed("job limiter closed".to_string()))?;

        let workspace = RequestWorkspace::create(&self.work_root).await?;
        let span = info_span!("list_path_names", request_id = %workspace.id());

        async move {
            let outcome = self.dump_path_names(&xg_path, &workspace).await;
            workspace.release().await;
            if let Ok(listing) = &outcome {
                info!(count = listing.path_names.len(), "Listed path names");
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn dump_path_names(
        &self,
        xg_path: &Path,
        workspace: &RequestWorkspace,
    ) -> Result<PathNameListing, PipelineError> {
        let out = workspace.path_names_file();
        self.tool
            .list_paths(xg_path, workspace.dir(), &out)
            .await
            .map_err(|e| PipelineError::from_tool("vg paths", e, PipelineError::PathListingFailed))?;

        let path_names = LineReader::open(&out).await?.collect_remaining().await?;
        Ok(PathNameListing { path_names })
    }
}

/// Graph and alignment indices in `dir`, sorted by name
pub async fn list_indices_in(dir: &Path) -> tubemap_common::Result<CatalogListing> {
    Ok(CatalogListing {
        xg_files: listing::file_names_with_suffix(dir, GRAPH_INDEX_SUFFIX).await?,
        gam_indices: listing::file_names_with_suffix(dir, ALIGNMENT_INDEX_SUFFIX).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_both_index_kinds() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["chr22.xg", "chr1.xg", "NA12878.gam.index", "reads.gam", "README"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let listing = list_indices_in(dir.path()).await.unwrap();
        assert_eq!(listing.xg_files, vec!["chr1.xg", "chr22.xg"]);
        assert_eq!(listing.gam_indices, vec!["NA12878.gam.index"]);
    }

    #[tokio::test]
    async fn test_unreadable_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_indices_in(&dir.path().join("gone")).await.is_err());
    }

    #[test]
    fn test_listing_wire_names() {
        let listing = CatalogListing {
            xg_files: vec!["a.xg".to_string()],
            gam_indices: vec![],
        };
        assert_eq!(
            serde_json::to_value(&listing).unwrap(),
            serde_json::json!({"xgFiles": ["a.xg"], "gamIndices": []})
        );
    }
}
