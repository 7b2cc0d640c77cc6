// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool-call adapter: parameters in, `(llm_content, return_display)` out

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::errors::SearchError;
use crate::output::{render_outcome, status_line};
use crate::search::{SearchOutcome, SearchRequest, Searcher};
use crate::workspace::{normalize_path, shorten_path, WorkspaceContext};

pub const TOOL_NAME: &str = "spangrep_search";

const DESCRIPTION_PATH_MAX: usize = 40;

/// Render a finished search the way tool hosts expect it.
pub fn tool_result(
    request: &SearchRequest,
    searched: Result<SearchOutcome, SearchError>,
) -> ToolResult {
    match searched {
        Ok(outcome) => ToolResult {
            llm_content: render_outcome(request, &outcome),
            return_display: status_line(&outcome),
            is_error: false,
        },
        Err(err) if err.is_validation() => {
            tracing::debug!(error = %err, "search request rejected");
            ToolResult::error(format!("Error: {}", err), err.to_string())
        }
        Err(err) => {
            tracing::warn!(error = %err, "search failed");
            ToolResult::error(
                format!("Error during BM25 search operation: {}", err),
                err.to_string(),
            )
        }
    }
}

/// Arguments as sent by the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchToolParams {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// Detailed payload for the model
    pub llm_content: String,
    /// One-line status for humans
    pub return_display: String,
    pub is_error: bool,
}

impl ToolResult {
    fn error(llm_content: String, display: String) -> Self {
        Self {
            llm_content,
            return_display: format!("Error: {}", display),
            is_error: true,
        }
    }
}

pub struct SearchTool {
    searcher: Searcher,
    config: Config,
}

impl SearchTool {
    pub fn new(workspace: WorkspaceContext, config: Config) -> Self {
        Self {
            searcher: Searcher::from_config(workspace, &config),
            config,
        }
    }

    pub fn workspace(&self) -> &WorkspaceContext {
        self.searcher.workspace()
    }

    pub fn request(&self, params: &SearchToolParams, cancel: CancellationToken) -> SearchRequest {
        SearchRequest::new(params.query.clone())
            .with_path(params.path.clone())
            .with_include(params.include.clone())
            .with_chunking(
                self.config.merge_chunk_size(params.chunk_size),
                self.config.merge_overlap(params.overlap),
            )
            .with_cancellation(cancel)
    }

    /// Reason the parameters are unusable, if any.
    pub fn validate(&self, params: &SearchToolParams) -> Option<String> {
        match self.request(params, CancellationToken::new()).validate() {
            Ok(()) => None,
            Err(SearchError::InvalidParameters(reason)) => Some(reason),
            Err(other) => Some(other.to_string()),
        }
    }

    /// `'<query>' in <include> within <path>` for display
    pub fn description(&self, params: &SearchToolParams) -> String {
        let mut description = format!("'{}'", params.query);
        if let Some(include) = params.include.as_deref() {
            description.push_str(&format!(" in {}", include));
        }
        match params.path.as_deref() {
            Some(path) => {
                let workspace = self.workspace();
                let absolute = workspace.target_dir().join(path);
                let relative = workspace.make_relative(&normalize_path(&absolute));
                description.push_str(&format!(
                    " within {}",
                    shorten_path(&relative, DESCRIPTION_PATH_MAX)
                ));
            }
            None if self.workspace().roots().len() > 1 => {
                description.push_str(" across all workspace directories");
            }
            None => {}
        }
        description
    }

    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }

    pub fn execute(&self, params: &SearchToolParams, cancel: CancellationToken) -> ToolResult {
        let request = self.request(params, cancel);
        tool_result(&request, self.searcher.search(&request))
    }

    /// JSON schema advertised to tool hosts
    pub fn definition() -> Value {
        json!({
            "name": TOOL_NAME,
            "description": "Rank overlapping line chunks of workspace files against a free-text query (BM25) and return the top 10 with file, line range and score.",
            "inputSchema": {
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": { "type": "string", "description": "Free-text query; split into words." },
                    "path": { "type": "string", "description": "Directory to search, relative to the workspace root. Omit to search every workspace directory." },
                    "include": { "type": "string", "description": "Glob relative to the search directory, e.g. '*.rs' or 'src/**/*.ts'." },
                    "chunk_size": { "type": "integer", "minimum": 1, "description": "Lines per chunk (default 100)." },
                    "overlap": { "type": "integer", "minimum": 0, "description": "Lines shared by consecutive chunks (default 20)." }
                }
            }
        })
    }
}
