//! Alignment dump parsing

use std::path::Path;

use serde_json::Value;
use tubemap_common::LineReader;

use super::PipelineError;

/// Parse one JSON record per line, keeping file order
///
/// Blank lines are skipped; any other line that is not valid JSON fails
/// the whole read.
pub async fn read_alignment_records(file: &Path) -> Result<Vec<Value>, PipelineError> {
    let mut reader = LineReader::open(file).await?;
    let mut records = Vec::new();

    while let Some(line) = reader.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| PipelineError::Malformed {
            path: file.to_path_buf(),
            line: reader.line_number(),
            message: e.to_string(),
        })?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_keep_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("gam.json");
        std::fs::write(&file, "{\"name\":\"r2\"}\n\n{\"name\":\"r1\",\"score\":3}\n").unwrap();

        let records = read_alignment_records(&file).await.unwrap();
        assert_eq!(records, vec![json!({"name": "r2"}), json!({"name": "r1", "score": 3})]);
    }

    #[tokio::test]
    async fn test_bad_line_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("gam.json");
        std::fs::write(&file, "{}\n{not json\n").unwrap();

        let err = read_alignment_records(&file).await.unwrap_err();
        match err {
            PipelineError::Malformed { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
