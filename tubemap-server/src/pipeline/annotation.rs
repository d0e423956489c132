//! Haplotype frequency merge
//!
//! `vg chunk -T` writes one line per traced path, `<name> <frequency>`, in
//! the same order as the paths of the graph dump. Matching is positional:
//! line N fills `freq` of path entry N. A name disagreement still assigns
//! the frequency and is only logged.

use std::path::Path;

use tracing::{debug, warn};
use tubemap_common::LineReader;

use super::PipelineError;
use crate::model::PathEntry;

/// Counters reported after a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationSummary {
    /// Entries whose `freq` was set
    pub assigned: usize,
    /// Lines whose name differed from the entry at the same position
    pub mismatches: usize,
    /// Lines beyond the last path entry
    pub surplus: usize,
}

/// Positional merger over the path list of one graph
pub struct AnnotationMerger<'a> {
    paths: &'a mut [PathEntry],
    next: usize,
    summary: AnnotationSummary,
}

impl<'a> AnnotationMerger<'a> {
    pub fn new(paths: &'a mut [PathEntry]) -> Self {
        Self {
            paths,
            next: 0,
            summary: AnnotationSummary::default(),
        }
    }

    /// Apply one annotation line
    ///
    /// Blank lines are skipped without consuming a position.
    pub fn feed(&mut self, line: &str) {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            return;
        };
        let freq = tokens.next();

        let index = self.next;
        self.next += 1;

        let Some(entry) = self.paths.get_mut(index) else {
            self.summary.surplus += 1;
            return;
        };

        if entry.name != name {
            self.summary.mismatches += 1;
            warn!(
                index,
                expected = %entry.name,
                found = name,
                "Annotation name mismatch"
            );
        }

        if let Some(freq) = freq {
            entry.freq = Some(freq.to_string());
            self.summary.assigned += 1;
        }
    }

    pub fn finish(self) -> AnnotationSummary {
        if self.summary.surplus > 0 {
            warn!(
                surplus = self.summary.surplus,
                paths = self.paths.len(),
                "Annotation file has more lines than the graph has paths"
            );
        }
        self.summary
    }
}

/// Stream `file` into the `freq` fields of `paths`
pub async fn merge_annotation_file(
    paths: &mut [PathEntry],
    file: &Path,
) -> Result<AnnotationSummary, PipelineError> {
    let mut reader = LineReader::open(file).await?;
    let mut merger = AnnotationMerger::new(paths);

    while let Some(line) = reader.next_line().await? {
        merger.feed(&line);
    }

    let summary = merger.finish();
    debug!(
        assigned = summary.assigned,
        mismatches = summary.mismatches,
        "Merged annotation file {}",
        file.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathEntry> {
        names.iter().map(|n| PathEntry::named(*n)).collect()
    }

    fn freqs(paths: &[PathEntry]) -> Vec<Option<&str>> {
        paths.iter().map(|p| p.freq.as_deref()).collect()
    }

    #[test]
    fn test_positional_merge() {
        let mut p = paths(&["chr1", "chr2"]);
        let mut merger = AnnotationMerger::new(&mut p);
        merger.feed("chr1 10");
        merger.feed("chr2\t\t20");
        let summary = merger.finish();

        assert_eq!(freqs(&p), vec![Some("10"), Some("20")]);
        assert_eq!(summary.assigned, 2);
        assert_eq!(summary.mismatches, 0);
    }

    #[test]
    fn test_mismatched_names_still_assigned_by_position() {
        let mut p = paths(&["chr1", "chr2"]);
        let mut merger = AnnotationMerger::new(&mut p);
        merger.feed("chr2 20");
        merger.feed("chr1 10");
        let summary = merger.finish();

        // No reordering by name
        assert_eq!(freqs(&p), vec![Some("20"), Some("10")]);
        assert_eq!(summary.mismatches, 2);
    }

    #[test]
    fn test_fewer_lines_leave_remaining_unset() {
        let mut p = paths(&["a", "b", "c"]);
        let mut merger = AnnotationMerger::new(&mut p);
        merger.feed("a 0.5");
        merger.finish();

        assert_eq!(freqs(&p), vec![Some("0.5"), None, None]);
    }

    #[test]
    fn test_surplus_lines_are_counted_not_fatal() {
        let mut p = paths(&["a"]);
        let mut merger = AnnotationMerger::new(&mut p);
        merger.feed("a 1");
        merger.feed("b 2");
        merger.feed("c 3");
        let summary = merger.finish();

        assert_eq!(summary.surplus, 2);
        assert_eq!(freqs(&p), vec![Some("1")]);
    }

    #[test]
    fn test_blank_lines_do_not_consume_a_position() {
        let mut p = paths(&["a", "b"]);
        let mut merger = AnnotationMerger::new(&mut p);
        merger.feed("");
        merger.feed("   a 1");
        merger.feed("\t");
        merger.feed("b 2");
        merger.finish();

        assert_eq!(freqs(&p), vec![Some("1"), Some("2")]);
    }

    #[test]
    fn test_name_only_line_consumes_position() {
        let mut p = paths(&["a", "b"]);
        let mut merger = AnnotationMerger::new(&mut p);
        merger.feed("a");
        merger.feed("b 2");
        merger.finish();

        assert_eq!(freqs(&p), vec![None, Some("2")]);
    }

    #[tokio::test]
    async fn test_merge_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("chunk_0_annotate.txt");
        std::fs::write(&file, "chr1 10\nchr2 20\n").unwrap();

        let mut p = paths(&["chr1", "chr2"]);
        let summary = merge_annotation_file(&mut p, &file).await.unwrap();

        assert_eq!(summary.assigned, 2);
        assert_eq!(freqs(&p), vec![Some("10"), Some("20")]);
    }
}
