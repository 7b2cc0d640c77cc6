// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workspace roots and path containment checks

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::errors::SearchError;

/// The set of directories a request may search
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    roots: Vec<PathBuf>,
}

impl WorkspaceContext {
    /// Roots must be absolute. The first root is the target directory that
    /// relative request paths are resolved against.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        let mut normalized: Vec<PathBuf> = Vec::with_capacity(roots.len());
        for root in roots {
            let root = normalize_path(&root);
            if !normalized.contains(&root) {
                normalized.push(root);
            }
        }
        Self { roots: normalized }
    }

    pub fn single(root: impl Into<PathBuf>) -> Self {
        Self::new(vec![root.into()])
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn target_dir(&self) -> &Path {
        self.roots
            .first()
            .map(PathBuf::as_path)
            .unwrap_or_else(|| Path::new("."))
    }

    /// Directories to search: the resolved request path, or every root when
    /// no path was given.
    pub fn search_dirs(&self, requested: Option<&str>) -> Result<Vec<PathBuf>, SearchError> {
        match requested {
            Some(path) => Ok(vec![self.resolve_search_dir(path)?]),
            None => Ok(self.roots.clone()),
        }
    }

    /// Resolve `requested` against the target directory and check that it
    /// stays inside a root and names an existing directory.
    pub fn resolve_search_dir(&self, requested: &str) -> Result<PathBuf, SearchError> {
        let requested_path = Path::new(requested);
        let joined = if requested_path.is_absolute() {
            requested_path.to_path_buf()
        } else {
            self.target_dir().join(requested_path)
        };
        let normalized = normalize_path(&joined);
        let physical = resolve_physical(&normalized);

        if !self.contains(&physical) {
            return Err(SearchError::OutOfWorkspace {
                path: normalized,
                roots: self.roots.clone(),
            });
        }

        match fs::metadata(&physical) {
            Ok(meta) if meta.is_dir() => Ok(physical),
            Ok(_) => Err(SearchError::NotADirectory(normalized)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(SearchError::PathNotFound(normalized))
            }
            Err(source) => Err(SearchError::PathAccess {
                path: normalized,
                source,
            }),
        }
    }

    /// True when `path` (already physical) is a root or lies beneath one.
    pub fn contains(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| {
            path.starts_with(root) || path.starts_with(resolve_physical(root))
        })
    }

    /// Path shown to users: relative to the target directory when possible.
    pub fn make_relative(&self, path: &Path) -> String {
        match path.strip_prefix(self.target_dir()) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }
}

/// Lexically remove `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                cleaned.push(component.as_os_str());
            }
        }
    }

    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// rest, so symlinks are followed even when the leaf does not exist.
fn resolve_physical(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut missing: Vec<&std::ffi::OsStr> = Vec::new();

    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            let mut resolved = canonical;
            for part in missing.iter().rev() {
                resolved.push(part);
            }
            return resolved;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Shorten a display path to at most `max_len` characters, keeping the first
/// component and as much of the tail as fits.
pub fn shorten_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let separator = std::path::MAIN_SEPARATOR;
    let parts: Vec<&str> = path.split(separator).collect();
    let head = if path.starts_with(separator) {
        format!("{}{}", separator, parts.get(1).copied().unwrap_or_default())
    } else {
        parts.first().copied().unwrap_or_default().to_string()
    };
    let ellipsis = "...";

    let mut tail: Vec<&str> = Vec::new();
    let mut used = head.chars().count() + ellipsis.len() + 1;
    for part in parts.iter().rev() {
        let cost = part.chars().count() + 1;
        if used + cost > max_len || tail.len() + 2 > parts.len() {
            break;
        }
        used += cost;
        tail.push(part);
    }

    if tail.is_empty() {
        let keep = max_len.saturating_sub(ellipsis.len());
        let suffix: String = path
            .chars()
            .rev()
            .take(keep)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return format!("{}{}", ellipsis, suffix);
    }

    tail.reverse();
    format!(
        "{}{}{}{}{}",
        head,
        separator,
        ellipsis,
        separator,
        tail.join(&separator.to_string())
    )
}
