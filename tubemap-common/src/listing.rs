//! Suffix-based directory listing
//!
//! Used by the catalog lister (index files in a reference-data directory)
//! and by artifact discovery inside a request's working directory.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Names of the regular files in `dir` ending with `suffix`, sorted
///
/// Symlinks are followed, so a symlinked index counts as a file. Names that
/// are not valid UTF-8 are skipped.
pub async fn file_names_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<String>> {
    let mut names: Vec<String> = list_files(dir)
        .await?
        .into_iter()
        .filter(|name| name.ends_with(suffix))
        .collect();
    names.sort();
    Ok(names)
}

/// Full paths of the regular files in `dir` ending with `suffix`, sorted
pub async fn paths_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    Ok(file_names_with_suffix(dir, suffix)
        .await?
        .into_iter()
        .map(|name| dir.join(name))
        .collect())
}

/// Names of every regular file in `dir`, in directory order
async fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::io(dir, e))?;

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(dir, e))? {
        let path = entry.path();
        let is_file = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.is_file(),
            // Dangling symlink
            Err(_) => false,
        };
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_filters_and_sorts_by_suffix() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xg", "a.xg", "reads.gam.index", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("sub.xg")).unwrap();

        let xg = file_names_with_suffix(dir.path(), "xg").await.unwrap();
        assert_eq!(xg, vec!["a.xg", "b.xg"]);

        let gam = file_names_with_suffix(dir.path(), "gam.index").await.unwrap();
        assert_eq!(gam, vec!["reads.gam.index"]);
    }

    #[tokio::test]
    async fn test_paths_are_joined_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("chunk_0_annotate.txt"), b"").unwrap();

        let found = paths_with_suffix(dir.path(), "annotate.txt").await.unwrap();
        assert_eq!(found, vec![dir.path().join("chunk_0_annotate.txt")]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_files(&dir.path().join("absent")).await.unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
