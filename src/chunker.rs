// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line-based chunking with fixed size and overlap

use serde::Serialize;
use std::path::Path;

pub const DEFAULT_CHUNK_SIZE: usize = 100;
pub const DEFAULT_OVERLAP: usize = 20;

/// A contiguous window of lines from one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Path relative to the search root, or the base name when outside it
    pub path: String,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    pub content: String,
}

impl Chunk {
    pub fn line_count(&self) -> usize {
        self.end_line + 1 - self.start_line
    }
}

/// Split `text` into overlapping windows of `chunk_size` lines.
///
/// Windows start at lines `1, 1+step, 1+2*step, ...` with
/// `step = chunk_size - overlap`; the last one ends exactly at the final
/// line and may be shorter. Callers guarantee `overlap < chunk_size`.
pub fn chunk_lines(path: &str, text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    debug_assert!(overlap < chunk_size);

    let normalized = text.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.lines().collect();
    let total = lines.len();
    if total == 0 {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::with_capacity(total.div_ceil(step));
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(total);
        chunks.push(Chunk {
            path: path.to_string(),
            start_line: start + 1,
            end_line: end,
            content: lines[start..end].join("\n"),
        });
        if end == total {
            break;
        }
        start += step;
    }

    chunks
}

/// Path to report for a chunk: relative to `root`, else the file's base name.
pub fn chunk_display_path(file: &Path, root: &Path) -> String {
    if let Ok(rel) = file.strip_prefix(root) {
        let rendered = rel.display().to_string();
        if !rendered.is_empty() {
            return rendered;
        }
    }

    file.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}
