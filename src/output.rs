// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report rendering for search outcomes

use serde::Serialize;
use std::io::{self, IsTerminal};

use crate::search::{ScoredChunk, SearchOutcome, SearchRequest};

const RESULT_SEPARATOR: &str = "---";

/// `1 match` / `3 matches`
pub fn match_count_label(count: usize) -> String {
    if count == 1 {
        "1 match".to_string()
    } else {
        format!("{} matches", count)
    }
}

fn scope_suffix(request: &SearchRequest) -> String {
    let mut suffix = String::new();
    if let Some(path) = request.path.as_deref() {
        suffix.push_str(&format!(" in path \"{}\"", path));
    }
    if let Some(include) = request.include.as_deref() {
        suffix.push_str(&format!(" (filter: \"{}\")", include));
    }
    suffix
}

pub fn no_files_message(request: &SearchRequest) -> String {
    format!(
        "No files found for query \"{}\"{}.",
        request.query,
        scope_suffix(request)
    )
}

pub fn no_matches_message(request: &SearchRequest) -> String {
    format!(
        "No matches found for query \"{}\"{}.",
        request.query,
        scope_suffix(request)
    )
}

/// Full text report: header, then one block per result.
pub fn format_report(request: &SearchRequest, results: &[ScoredChunk]) -> String {
    let mut out = format!(
        "Found {} for query \"{}\"{}:\n{}\n",
        match_count_label(results.len()),
        request.query,
        scope_suffix(request),
        RESULT_SEPARATOR
    );

    for result in results {
        let chunk = &result.chunk;
        out.push_str(&format!("File: {}\n", chunk.path));
        out.push_str(&format!("Lines: {}-{}\n", chunk.start_line, chunk.end_line));
        out.push_str(&format!("Score: {:.4}\n", result.score));
        out.push_str(&chunk.content);
        out.push('\n');
        out.push_str(RESULT_SEPARATOR);
        out.push('\n');
    }

    out.trim_end().to_string()
}

/// Detailed payload for an outcome
pub fn render_outcome(request: &SearchRequest, outcome: &SearchOutcome) -> String {
    match outcome {
        SearchOutcome::NoFiles => no_files_message(request),
        SearchOutcome::NoMatches => no_matches_message(request),
        SearchOutcome::Matches(results) => format_report(request, results),
    }
}

/// Short status line for an outcome
pub fn status_line(outcome: &SearchOutcome) -> String {
    match outcome {
        SearchOutcome::NoFiles => "No files found".to_string(),
        SearchOutcome::NoMatches => "No matches found".to_string(),
        SearchOutcome::Matches(results) => format!("Found {}", match_count_label(results.len())),
    }
}

/// Machine-readable form of a completed search
#[derive(Debug, Serialize)]
pub struct SearchReport<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<&'a str>,
    pub status: &'static str,
    pub total_matches: usize,
    pub results: &'a [ScoredChunk],
}

impl<'a> SearchReport<'a> {
    pub fn new(request: &'a SearchRequest, outcome: &'a SearchOutcome) -> Self {
        let status = match outcome {
            SearchOutcome::NoFiles => "no_files",
            SearchOutcome::NoMatches => "no_matches",
            SearchOutcome::Matches(_) => "matches",
        };
        Self {
            query: &request.query,
            path: request.path.as_deref(),
            include: request.include.as_deref(),
            status,
            total_matches: outcome.matches().len(),
            results: outcome.matches(),
        }
    }
}

/// Print JSON to stdout, pretty unless `compact`
pub fn print_json<T: Serialize>(value: &T, compact: bool) -> anyhow::Result<()> {
    let rendered = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", rendered);
    Ok(())
}

/// Colors only when stderr is a terminal and NO_COLOR is unset
pub fn use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal()
}
