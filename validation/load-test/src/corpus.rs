//! Search query corpus.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::random::RandomSource;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Query corpus is empty")]
    Empty,

    #[error("Failed to read query file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ordered, non-empty collection of candidate search strings.
#[derive(Debug, Clone)]
pub struct QueryCorpus {
    queries: Vec<String>,
}

impl QueryCorpus {
    /// Build a corpus, dropping blank entries. Fails if nothing is left.
    pub fn new<I, S>(queries: I) -> Result<Self, CorpusError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queries: Vec<String> = queries
            .into_iter()
            .map(Into::into)
            .filter(|q| !q.trim().is_empty())
            .collect();
        if queries.is_empty() {
            return Err(CorpusError::Empty);
        }
        Ok(Self { queries })
    }

    /// Load one query per line. Lines starting with `#` are comments.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CorpusError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    /// Pick one query uniformly at random.
    pub fn choose(&self, rng: &mut dyn RandomSource) -> &str {
        &self.queries[rng.index(self.queries.len())]
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }
}
