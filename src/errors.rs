// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for a search request
//!
//! Everything scoped to a single file is recovered inside the pipeline and
//! never shows up here. These variants abort the whole request.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Request shape rejected before any I/O happened
    #[error("Invalid parameters provided. Reason: {0}")]
    InvalidParameters(String),

    #[error(
        "Path validation failed: attempted path \"{}\" resolves outside the allowed workspace directories: {}",
        .path.display(),
        render_roots(.roots)
    )]
    OutOfWorkspace { path: PathBuf, roots: Vec<PathBuf> },

    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Failed to access path stats for {}: {source}", .path.display())]
    PathAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("search was cancelled")]
    Cancelled,

    /// Anything unexpected during enumeration, chunking or ranking
    #[error("{0:#}")]
    OperationFailed(#[from] anyhow::Error),
}

impl SearchError {
    /// True for failures caused by the caller's path or parameters rather
    /// than by the search itself.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameters(_)
                | Self::OutOfWorkspace { .. }
                | Self::NotADirectory(_)
                | Self::PathNotFound(_)
                | Self::PathAccess { .. }
        )
    }
}

fn render_roots(roots: &[PathBuf]) -> String {
    roots
        .iter()
        .map(|root| root.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Helper functions for creating helpful error messages
pub mod suggestions {
    /// Hint appended by the CLI when a path escapes the workspace
    pub fn workspace_root_suggestion(path: &str) -> String {
        format!(
            "'{}' is outside every workspace root.\n\n\
             Add it as a root explicitly:\n\
             $ spangrep search \"query\" --root {}",
            path, path
        )
    }
}
