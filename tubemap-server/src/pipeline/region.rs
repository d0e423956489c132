//! Region table merge
//!
//! Each line of the region table is `<path name> <offset>`; every path entry
//! with that name gets `indexOfFirstBase = offset`. Several entries may share
//! a name and all of them are updated.

use std::path::Path;

use tracing::debug;
use tubemap_common::LineReader;

use super::PipelineError;
use crate::model::PathEntry;

/// Apply one region table line, returning how many entries it updated
pub fn apply_region_line(paths: &mut [PathEntry], line: &str) -> usize {
    let mut tokens = line.split_whitespace();
    let (Some(name), Some(offset)) = (tokens.next(), tokens.next()) else {
        return 0;
    };

    let mut updated = 0;
    for entry in paths.iter_mut().filter(|p| p.name == name) {
        entry.index_of_first_base = Some(offset.to_string());
        updated += 1;
    }
    updated
}

/// Stream the region table into the `indexOfFirstBase` fields of `paths`
pub async fn merge_region_table(paths: &mut [PathEntry], file: &Path) -> Result<usize, PipelineError> {
    let mut reader = LineReader::open(file).await?;
    let mut updated = 0;
    let mut unmatched = 0;

    while let Some(line) = reader.next_line().await? {
        match apply_region_line(paths, &line) {
            0 => unmatched += 1,
            n => updated += n,
        }
    }

    debug!(updated, unmatched, "Merged region table {}", file.display());
    Ok(updated)
}
