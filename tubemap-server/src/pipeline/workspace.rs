//! Per-request working directory
//!
//! Every transient artifact of a request lives in `<work_root>/<uuid>/`:
//! the graph dump, the region table, the annotation file, the alignment
//! chunk and its JSON conversion, the path-names dump. Nothing is shared
//! between requests, so concurrent requests cannot read or delete each
//! other's files.
//!
//! The directory is removed by [`RequestWorkspace::release`] at the end of
//! the pipeline. If the owning future is dropped first (client went away,
//! panic in a stage), `Drop` removes it instead.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use tubemap_common::listing;
use uuid::Uuid;

/// Region table written by `vg chunk -E`
const REGION_TABLE: &str = "regions.tsv";
/// JSON conversion of the alignment chunk
const ALIGNMENT_JSON: &str = "gam.json";
/// Output of `vg paths -X`
const PATH_NAMES: &str = "pathNames.txt";

/// Result of looking for a tool side-output by suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLookup {
    Found(PathBuf),
    Missing,
    Ambiguous(Vec<PathBuf>),
}

/// Directory owning one request's transient files
#[derive(Debug)]
pub struct RequestWorkspace {
    id: Uuid,
    dir: PathBuf,
    released: bool,
}

impl RequestWorkspace {
    /// Create a fresh, empty directory under `work_root`
    ///
    /// The directory path is made absolute: the tool runs inside it and
    /// receives artifact paths as arguments.
    pub async fn create(work_root: &Path) -> tubemap_common::Result<Self> {
        let id = Uuid::new_v4();
        let dir = super::absolute_path(work_root)?.join(id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| tubemap_common::Error::io(&dir, e))?;
        debug!(request_id = %id, dir = %dir.display(), "Created request workspace");

        Ok(Self {
            id,
            dir,
            released: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Graph dump, named after the request id
    pub fn graph_file(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.id))
    }

    pub fn region_table(&self) -> PathBuf {
        self.dir.join(REGION_TABLE)
    }

    pub fn alignment_json(&self) -> PathBuf {
        self.dir.join(ALIGNMENT_JSON)
    }

    pub fn path_names_file(&self) -> PathBuf {
        self.dir.join(PATH_NAMES)
    }

    /// Find the single file in this workspace whose name ends with `suffix`
    pub async fn find_artifact(&self, suffix: &str) -> tubemap_common::Result<ArtifactLookup> {
        let mut found = listing::paths_with_suffix(&self.dir, suffix).await?;
        Ok(match found.len() {
            0 => ArtifactLookup::Missing,
            1 => ArtifactLookup::Found(found.remove(0)),
            _ => ArtifactLookup::Ambiguous(found),
        })
    }

    /// Remove the directory and everything in it
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => debug!(request_id = %self.id, "Removed request workspace"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                request_id = %self.id,
                dir = %self.dir.display(),
                "Failed to remove request workspace: {}",
                e
            ),
        }
    }
}

impl Drop for RequestWorkspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Async release never ran; fall back to a blocking removal
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    request_id = %self.id,
                    dir = %self.dir.display(),
                    "Failed to remove abandoned request workspace: {}",
                    e
                );
            }
        } else {
            debug!(request_id = %self.id, "Removed abandoned request workspace");
        }
    }
}
