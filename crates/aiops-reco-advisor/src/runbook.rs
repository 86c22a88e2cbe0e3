//! Runbook snippet retrieval.
//!
//! Runbooks are a plain-text file of paragraphs separated by blank lines.
//! Retrieval is lexical: the paragraph sharing the most lowercase
//! alphanumeric tokens with the query wins.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use aiops_reco_core::text::truncate_chars;

/// Default cap on a retrieved snippet.
pub const MAX_RUNBOOK_CHARS: usize = 2000;

struct Chunk {
    text: String,
    tokens: HashSet<String>,
}

/// In-memory runbook paragraphs, loaded once at startup.
#[derive(Default)]
pub struct RunbookIndex {
    chunks: Vec<Chunk>,
}

impl RunbookIndex {
    /// An index with no runbooks.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an index from runbook text.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let chunks = text
            .split("\n\n")
            .filter(|chunk| !chunk.trim().is_empty())
            .map(|chunk| Chunk {
                text: chunk.to_string(),
                tokens: tokens(chunk),
            })
            .collect();
        Self { chunks }
    }

    /// Load runbooks from `path`. A missing file yields an empty index.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path) -> io::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let index = Self::from_text(&text);
                info!(path = %path.display(), chunks = index.len(), "Loaded runbooks");
                Ok(index)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No runbook file, continuing without runbooks");
                Ok(Self::empty())
            }
            Err(e) => Err(e),
        }
    }

    /// Number of paragraphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether there are no paragraphs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The best-matching paragraph for `query`, capped at `max_chars`.
    ///
    /// Ties go to the earlier paragraph. Returns `None` when nothing shares a
    /// single token with the query.
    #[must_use]
    pub fn retrieve(&self, query: &str, max_chars: usize) -> Option<String> {
        let wanted = tokens(query);
        let mut best: Option<(&Chunk, usize)> = None;

        for chunk in &self.chunks {
            let score = chunk.tokens.intersection(&wanted).count();
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((chunk, score));
            }
        }

        best.map(|(chunk, _)| truncate_chars(&chunk.text, max_chars))
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RUNBOOKS: &str = "\
PodCrashLoop: check the previous container logs with kubectl logs --previous.
Look for missing ConfigMaps or Secrets.

HighMemory: check container memory limits and OOMKilled terminations.

DiskPressure on node: clean up images.";

    #[test]
    fn retrieve_picks_highest_overlap() {
        let index = RunbookIndex::from_text(RUNBOOKS);
        assert_eq!(index.len(), 3);

        let hit = index
            .retrieve("PodCrashLoop badpod is crashing ai-test warning", 2000)
            .unwrap();
        assert!(hit.starts_with("PodCrashLoop:"));

        let hit = index.retrieve("HighMemory OOMKilled", 2000).unwrap();
        assert!(hit.starts_with("HighMemory:"));
    }

    #[test]
    fn retrieve_without_overlap_is_none() {
        let index = RunbookIndex::from_text(RUNBOOKS);
        assert!(index.retrieve("zzz qqq", 2000).is_none());
        assert!(RunbookIndex::empty().retrieve("PodCrashLoop", 2000).is_none());
    }

    #[test]
    fn retrieve_caps_snippet() {
        let index = RunbookIndex::from_text(RUNBOOKS);
        let hit = index.retrieve("PodCrashLoop", 12).unwrap();
        assert_eq!(hit, "PodCrashLoop");
    }

    #[test]
    fn load_reads_file_and_tolerates_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RUNBOOKS.as_bytes()).unwrap();

        let index = RunbookIndex::load(file.path()).unwrap();
        assert_eq!(index.len(), 3);

        let dir = tempfile::tempdir().unwrap();
        let missing = RunbookIndex::load(&dir.path().join("runbooks.txt")).unwrap();
        assert!(missing.is_empty());
    }
}
