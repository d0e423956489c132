//! Line-oriented file reader
//!
//! Every parser in the extraction pipeline consumes tool output through
//! [`LineReader`], so they all share one completion and failure contract:
//! `Ok(Some(line))` for each line with the trailing newline stripped,
//! `Ok(None)` once at end of file, `Err` on any I/O failure.
//!
//! The sequence is lazy and cannot be restarted; open a new reader to
//! read the file again.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::{Error, Result};

/// Lazy line sequence over one file
#[derive(Debug)]
pub struct LineReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_number: usize,
    finished: bool,
}

impl LineReader {
    /// Open `path` for line-by-line reading
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .await
            .map_err(|e| Error::io(&path, e))?;

        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line_number: 0,
            finished: false,
        })
    }

    /// Next line, or `None` once the file is exhausted
    ///
    /// `\n` and `\r\n` terminators are both stripped. After `None` has been
    /// returned every further call returns `None` again without touching
    /// the file.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        if self.finished {
            return Ok(None);
        }

        match self.lines.next_line().await {
            Ok(Some(line)) => {
                self.line_number += 1;
                Ok(Some(line))
            }
            Ok(None) => {
                self.finished = true;
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                Err(Error::io(&self.path, e))
            }
        }
    }

    /// 1-based number of the line most recently returned (0 before the first)
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Drain the remaining lines into a vector
    pub async fn collect_remaining(mut self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        while let Some(line) = self.next_line().await? {
            out.push(line);
        }
        Ok(out)
    }
}
