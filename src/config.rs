// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for spangrep
//!
//! Loads configuration from .spangreprc.toml in current directory or ~/.config/spangrep/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chunker::{DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};

/// Ranking backend selectable from config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankerKind {
    /// In-memory Okapi BM25
    #[default]
    Bm25,
    /// Throwaway in-RAM tantivy index
    Tantivy,
}

/// Configuration loaded from .spangreprc.toml or ~/.config/spangrep/config.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default chunk size in lines
    pub chunk_size: Option<usize>,
    /// Default overlap between consecutive chunks in lines
    pub overlap: Option<usize>,
    /// Ranking backend
    pub ranker: RankerKind,
    /// Apply .gitignore/.ignore rules on top of the fixed ignore list
    pub respect_gitignore: bool,
    /// Workspace roots used when none are given on the command line
    pub workspace_dirs: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .spangreprc.toml in current directory
    /// 2. ~/.config/spangrep/config.toml
    pub fn load() -> Self {
        if let Some(config) = Self::load_from_path(Path::new(".spangreprc.toml")) {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("spangrep").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    pub fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge CLI chunk size with config (CLI wins)
    pub fn merge_chunk_size(&self, cli_value: Option<usize>) -> usize {
        cli_value.or(self.chunk_size).unwrap_or(DEFAULT_CHUNK_SIZE)
    }

    /// Merge CLI overlap with config (CLI wins)
    pub fn merge_overlap(&self, cli_value: Option<usize>) -> usize {
        cli_value.or(self.overlap).unwrap_or(DEFAULT_OVERLAP)
    }

    /// Workspace roots: CLI values, then config, then the current directory.
    /// Relative entries are resolved against `cwd`.
    pub fn workspace_roots(&self, cli_roots: &[PathBuf], cwd: &Path) -> Vec<PathBuf> {
        let chosen = if !cli_roots.is_empty() {
            cli_roots.to_vec()
        } else if !self.workspace_dirs.is_empty() {
            self.workspace_dirs.clone()
        } else {
            vec![cwd.to_path_buf()]
        };

        chosen
            .into_iter()
            .map(|root| if root.is_absolute() { root } else { cwd.join(root) })
            .collect()
    }
}
