//! Region extraction request body and its validation

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use super::PipelineError;
use crate::tool::Selection;

/// Value of `gamIndex` meaning "no alignments"
pub const NO_ALIGNMENT_INDEX: &str = "none";

/// The two reference-data directories a request can read from
#[derive(Debug, Clone)]
pub struct DataDirs {
    pub mounted: PathBuf,
    pub internal: PathBuf,
}

impl DataDirs {
    pub fn select(&self, use_mounted: bool) -> &Path {
        if use_mounted {
            &self.mounted
        } else {
            &self.internal
        }
    }
}

/// JSON body of `POST /extractRegion`
///
/// The browser client sends every field as a string; numbers and booleans
/// are accepted as well.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRegionBody {
    #[serde(rename = "nodeID", deserialize_with = "string_or_number")]
    pub node_id: String,

    #[serde(deserialize_with = "string_or_number")]
    pub distance: String,

    pub xg_file: String,

    #[serde(default)]
    pub gam_index: Option<String>,

    #[serde(default)]
    pub anchor_track_name: Option<String>,

    #[serde(default, deserialize_with = "flag")]
    pub use_mounted_path: bool,

    #[serde(default, deserialize_with = "flag")]
    pub by_node: bool,
}

/// Validated region extraction request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRequest {
    /// Full path of the graph index
    pub xg_file: PathBuf,
    /// Full path of the alignment index, if alignments were requested
    pub gam_index: Option<PathBuf>,
    pub selection: Selection,
}

impl RegionRequest {
    pub fn with_alignments(&self) -> bool {
        self.gam_index.is_some()
    }
}

impl ExtractRegionBody {
    /// Check every field and resolve file names against the chosen data directory
    pub fn validate(self, dirs: &DataDirs) -> Result<RegionRequest, PipelineError> {
        let data_dir = dirs.select(self.use_mounted_path);

        check_file_name("xgFile", &self.xg_file)?;
        let xg_file = data_dir.join(&self.xg_file);

        let gam_index = match self.gam_index.as_deref().map(str::trim) {
            None | Some("") | Some(NO_ALIGNMENT_INDEX) => None,
            Some(name) => {
                check_file_name("gamIndex", name)?;
                Some(data_dir.join(name))
            }
        };

        let position = parse_count("nodeID", &self.node_id)?;
        let distance = parse_count("distance", &self.distance)?;

        let selection = if self.by_node {
            Selection::ByNode {
                node_id: position,
                distance,
            }
        } else {
            let anchor = self
                .anchor_track_name
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .ok_or_else(|| {
                    PipelineError::InvalidRequest(
                        "anchorTrackName is required unless byNode is true".to_string(),
                    )
                })?;
            let end = position.checked_add(distance).ok_or_else(|| {
                PipelineError::InvalidRequest("nodeID + distance overflows".to_string())
            })?;
            Selection::ByCoordinate {
                anchor: anchor.to_string(),
                start: position,
                end,
            }
        };

        Ok(RegionRequest {
            xg_file,
            gam_index,
            selection,
        })
    }
}

/// Reject anything that is not a plain file name inside the data directory
pub fn check_file_name(field: &str, name: &str) -> Result<(), PipelineError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0');

    if valid {
        Ok(())
    } else {
        Err(PipelineError::InvalidRequest(format!(
            "{} must be a plain file name, got {:?}",
            field, name
        )))
    }
}

fn parse_count(field: &str, value: &str) -> Result<u64, PipelineError> {
    value.trim().parse::<u64>().map_err(|_| {
        PipelineError::InvalidRequest(format!(
            "{} must be a non-negative integer, got {:?}",
            field, value
        ))
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Num(serde_json::Number),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Str(s) => s,
        StringOrNumber::Num(n) => n.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Str(String),
}

/// Only `true` and `"true"` count as set
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Str(s) => s == "true",
    })
}
