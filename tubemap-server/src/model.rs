//! Graph and response types
//!
//! The graph dump produced by `vg view -j` is passed through untouched
//! except for the `path` array, whose entries gain `freq` (from the
//! annotation file) and `indexOfFirstBase` (from the region table).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parsed graph dump of one extracted region
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Named paths, in dump order
    #[serde(default)]
    pub path: Vec<PathEntry>,

    /// Nodes, edges and anything else the tool emits
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One named path of the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathEntry {
    pub name: String,

    /// Haplotype frequency from the annotation file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<String>,

    /// Offset of the first base of this path inside the extracted region
    #[serde(
        rename = "indexOfFirstBase",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub index_of_first_base: Option<String>,

    /// Mappings and other path fields, passed through
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl PathEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            freq: None,
            index_of_first_base: None,
            rest: Map::new(),
        }
    }
}

/// Body of a successful region extraction
#[derive(Debug, Clone, Serialize)]
pub struct RegionResponse {
    pub graph: GraphDocument,
    /// Alignment records in tool order; empty when no alignment index was requested
    pub gam: Vec<Value>,
}
