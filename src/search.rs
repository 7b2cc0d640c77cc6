// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chunked BM25 search over a workspace
//!
//! A request runs in two stages. The gather stage walks every search
//! directory and chunks each file into the corpus; the rank stage scores the
//! whole corpus at once, because BM25 needs corpus-wide statistics, then keeps
//! the best chunks.

use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::chunker::{chunk_display_path, chunk_lines, Chunk, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use crate::config::Config;
use crate::errors::SearchError;
use crate::ranking::{ranker_for, tokenize, Bm25Ranker, Ranker};
use crate::scanner::{FileEnumerator, FileFilter};
use crate::workspace::WorkspaceContext;

/// Upper bound on reported chunks
pub const MAX_RESULTS: usize = 10;

/// One search invocation
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    /// Absolute, or relative to the workspace target directory
    pub path: Option<String>,
    pub include: Option<String>,
    pub chunk_size: usize,
    pub overlap: usize,
    pub cancel: CancellationToken,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            path: None,
            include: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_path(mut self, path: Option<impl Into<String>>) -> Self {
        self.path = path.map(Into::into);
        self
    }

    pub fn with_include(mut self, include: Option<impl Into<String>>) -> Self {
        self.include = include.map(Into::into);
        self
    }

    pub fn with_chunking(mut self, chunk_size: usize, overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.overlap = overlap;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.query.trim().is_empty() {
            return Err(SearchError::InvalidParameters(
                "The 'query' parameter cannot be empty.".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(SearchError::InvalidParameters(
                "'chunk_size' must be a positive integer.".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(SearchError::InvalidParameters(format!(
                "'overlap' ({}) must be smaller than 'chunk_size' ({}).",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), SearchError> {
        if self.cancel.is_cancelled() {
            Err(SearchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A chunk and its relevance score
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub score: f32,
}

/// Result of a completed search
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// No file under the search directories produced a chunk
    NoFiles,
    /// Chunks existed but none scored above zero
    NoMatches,
    /// Best chunks first, at most [`MAX_RESULTS`]
    Matches(Vec<ScoredChunk>),
}

impl SearchOutcome {
    pub fn matches(&self) -> &[ScoredChunk] {
        match self {
            Self::Matches(results) => results,
            Self::NoFiles | Self::NoMatches => &[],
        }
    }
}

/// Runs search requests against one workspace
pub struct Searcher {
    workspace: WorkspaceContext,
    ranker: Box<dyn Ranker>,
    respect_git_ignore: bool,
}

impl Searcher {
    pub fn new(workspace: WorkspaceContext) -> Self {
        Self {
            workspace,
            ranker: Box::new(Bm25Ranker::default()),
            respect_git_ignore: false,
        }
    }

    pub fn from_config(workspace: WorkspaceContext, config: &Config) -> Self {
        Self::new(workspace)
            .with_ranker(ranker_for(config.ranker))
            .with_gitignore(config.respect_gitignore)
    }

    pub fn with_ranker(mut self, ranker: Box<dyn Ranker>) -> Self {
        self.ranker = ranker;
        self
    }

    /// Enable or disable respect for git ignore rules
    pub fn with_gitignore(mut self, enabled: bool) -> Self {
        self.respect_git_ignore = enabled;
        self
    }

    pub fn workspace(&self) -> &WorkspaceContext {
        &self.workspace
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchOutcome, SearchError> {
        request.validate()?;
        let started = Instant::now();

        let dirs = self.workspace.search_dirs(request.path.as_deref())?;
        let filter = FileFilter::new(request.include.as_deref())
            .map_err(|err| SearchError::InvalidParameters(format!("{:#}", err)))?;

        let corpus = self.gather(&dirs, &filter, request)?;
        let outcome = self.rank(corpus, request)?;

        tracing::info!(
            query = %request.query,
            dirs = dirs.len(),
            matches = outcome.matches().len(),
            ranker = self.ranker.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search finished"
        );
        Ok(outcome)
    }

    /// Gather stage: chunks from every directory, concatenated in directory order.
    fn gather(
        &self,
        dirs: &[PathBuf],
        filter: &FileFilter,
        request: &SearchRequest,
    ) -> Result<Vec<Chunk>, SearchError> {
        let per_dir: Vec<Result<Vec<Chunk>, SearchError>> = dirs
            .par_iter()
            .map(|dir| collect_dir_chunks(dir, filter.clone(), self.respect_git_ignore, request))
            .collect();

        let mut corpus = Vec::new();
        for chunks in per_dir {
            corpus.extend(chunks?);
        }
        Ok(corpus)
    }

    /// Rank stage: score the complete corpus once, then select.
    fn rank(&self, corpus: Vec<Chunk>, request: &SearchRequest) -> Result<SearchOutcome, SearchError> {
        request.ensure_active()?;
        if corpus.is_empty() {
            return Ok(SearchOutcome::NoFiles);
        }

        let query_tokens = tokenize(&request.query);
        let documents: Vec<&str> = corpus.iter().map(|chunk| chunk.content.as_str()).collect();
        let scores = self.ranker.score(&documents, &query_tokens)?;
        if scores.len() != corpus.len() {
            return Err(SearchError::OperationFailed(anyhow::anyhow!(
                "ranker '{}' returned {} scores for {} chunks",
                self.ranker.name(),
                scores.len(),
                corpus.len()
            )));
        }

        request.ensure_active()?;
        Ok(select_top(corpus, scores, MAX_RESULTS))
    }
}

fn collect_dir_chunks(
    dir: &Path,
    filter: FileFilter,
    respect_git_ignore: bool,
    request: &SearchRequest,
) -> Result<Vec<Chunk>, SearchError> {
    request.ensure_active()?;

    let mut chunks = Vec::new();
    let mut files = 0usize;
    for path in FileEnumerator::new(dir, filter, respect_git_ignore, request.cancel.clone()) {
        request.ensure_active()?;
        let Some(content) = read_file(&path) else {
            continue;
        };
        files += 1;
        let display_path = chunk_display_path(&path, dir);
        chunks.extend(chunk_lines(
            &display_path,
            &content,
            request.chunk_size,
            request.overlap,
        ));
    }
    // The enumerator stops quietly on cancellation; surface it here.
    request.ensure_active()?;

    tracing::debug!(
        dir = %dir.display(),
        files,
        chunks = chunks.len(),
        "gathered chunks"
    );
    Ok(chunks)
}

/// Bytes inspected for a NUL when deciding whether a file is binary
const BINARY_SNIFF_LEN: usize = 8 * 1024;

fn read_file(path: &Path) -> Option<String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "skipping unreadable file");
            return None;
        }
    };

    if bytes[..bytes.len().min(BINARY_SNIFF_LEN)].contains(&0) {
        tracing::debug!(path = %path.display(), "skipping binary file");
        return None;
    }

    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Pair chunks with scores, drop non-positive scores, order best first
/// (stable, so ties keep discovery order) and keep at most `limit`.
pub fn select_top(corpus: Vec<Chunk>, scores: Vec<f32>, limit: usize) -> SearchOutcome {
    if corpus.is_empty() {
        return SearchOutcome::NoFiles;
    }

    let mut scored: Vec<ScoredChunk> = corpus
        .into_iter()
        .zip(scores)
        .filter(|(_, score)| *score > 0.0)
        .map(|(chunk, score)| ScoredChunk { chunk, score })
        .collect();
    if scored.is_empty() {
        return SearchOutcome::NoMatches;
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(limit);
    SearchOutcome::Matches(scored)
}
