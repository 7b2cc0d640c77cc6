// SPDX-License-Identifier: MIT OR Apache-2.0

//! File enumeration using the ignore crate (same walker as ripgrep)

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::{Walk, WalkBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Include pattern used when the caller gives none
pub const DEFAULT_INCLUDE: &str = "**/*";

/// Noise directories that are never searched
pub const IGNORED_GLOBS: &[&str] = &[
    "**/.git",
    "**/.git/**",
    "**/.hg",
    "**/.hg/**",
    "**/.svn",
    "**/.svn/**",
    "**/node_modules",
    "**/node_modules/**",
];

fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("Invalid glob pattern: {}", pattern))
}

/// Include/ignore rules for one enumeration
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: GlobSet,
    ignore: GlobSet,
}

impl FileFilter {
    pub fn new(include: Option<&str>) -> Result<Self> {
        let include_pattern = include
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
            .unwrap_or(DEFAULT_INCLUDE);

        let include = GlobSetBuilder::new()
            .add(compile_glob(include_pattern)?)
            .build()
            .context("Failed to build include glob set")?;

        let mut ignore = GlobSetBuilder::new();
        for pattern in IGNORED_GLOBS {
            ignore.add(compile_glob(pattern)?);
        }
        let ignore = ignore.build().context("Failed to build ignore glob set")?;

        Ok(Self { include, ignore })
    }

    /// `rel` is relative to the enumeration root.
    pub fn is_ignored(&self, rel: &Path) -> bool {
        self.ignore.is_match(rel)
    }

    pub fn is_included(&self, rel: &Path) -> bool {
        self.include.is_match(rel) && !self.ignore.is_match(rel)
    }
}

/// Lazy iterator over the files under a root that pass a [`FileFilter`].
///
/// Walk errors on single entries are logged and skipped. Once the token is
/// cancelled the iterator ends.
pub struct FileEnumerator {
    root: PathBuf,
    /// `root` with symlinks resolved, for checking file link targets
    physical_root: PathBuf,
    walk: Walk,
    filter: FileFilter,
    cancel: CancellationToken,
}

impl FileEnumerator {
    pub fn new(
        root: impl AsRef<Path>,
        filter: FileFilter,
        respect_git_ignore: bool,
        cancel: CancellationToken,
    ) -> Self {
        let root = root.as_ref().to_path_buf();

        let mut builder = WalkBuilder::new(&root);
        builder
            .hidden(false)
            .follow_links(false)
            .parents(respect_git_ignore)
            .ignore(respect_git_ignore)
            .git_ignore(respect_git_ignore)
            .git_exclude(respect_git_ignore)
            .git_global(respect_git_ignore)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b));

        let prune_root = root.clone();
        let prune_filter = filter.clone();
        builder.filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
            if !is_dir {
                return true;
            }
            match entry.path().strip_prefix(&prune_root) {
                Ok(rel) if !rel.as_os_str().is_empty() => !prune_filter.is_ignored(rel),
                _ => true,
            }
        });

        let physical_root = fs::canonicalize(&root).unwrap_or_else(|_| root.clone());

        Self {
            root,
            physical_root,
            walk: builder.build(),
            filter,
            cancel,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A symlink counts as a file when it resolves to a regular file inside
    /// the root. Directory links are never descended.
    fn is_linked_file(&self, link: &Path) -> bool {
        match fs::canonicalize(link) {
            Ok(target) => target.starts_with(&self.physical_root) && target.is_file(),
            Err(err) => {
                tracing::debug!(path = %link.display(), error = %err, "skipping dangling symlink");
                false
            }
        }
    }
}

impl Iterator for FileEnumerator {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }

            let entry = match self.walk.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(root = %self.root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            let is_file = match entry.file_type() {
                Some(ft) if ft.is_file() => true,
                Some(ft) if ft.is_symlink() => self.is_linked_file(entry.path()),
                _ => false,
            };
            if !is_file {
                continue;
            }

            let path = entry.into_path();
            let included = path
                .strip_prefix(&self.root)
                .map(|rel| self.filter.is_included(rel))
                .unwrap_or(false);
            if included {
                return Some(path);
            }
        }
    }
}
