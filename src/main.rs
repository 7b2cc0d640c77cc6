// SPDX-License-Identifier: MIT OR Apache-2.0

//! spangrep - ranked chunk search tool
//!
//! Cuts workspace files into overlapping line chunks and ranks them against a
//! query with BM25, either from the command line or as an MCP tool server.

mod cli;
mod mcp;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::Colorize;
use std::io;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, McpCommands, OutputFormat};
use spangrep::config::Config;
use spangrep::errors::{suggestions, SearchError};
use spangrep::output::{print_json, use_colors, SearchReport};
use spangrep::tool::{tool_result, SearchTool, SearchToolParams};
use spangrep::workspace::WorkspaceContext;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    colored::control::set_override(use_colors());

    let config = Config::load();
    let cwd = std::env::current_dir().context("Cannot determine current directory")?;
    let workspace = WorkspaceContext::new(config.workspace_roots(&cli.roots, &cwd));

    match cli.command {
        Commands::Search {
            query,
            path_positional,
            path,
            include,
            chunk_size,
            overlap,
        } => {
            let params = SearchToolParams {
                query,
                path: path.or(path_positional),
                include,
                chunk_size,
                overlap,
            };
            let tool = SearchTool::new(workspace, config);
            run_search(tool, params, cli.format, cli.compact).await?;
        }
        Commands::Mcp {
            command: McpCommands::Serve,
        } => {
            mcp::run(SearchTool::new(workspace, config)).await?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "spangrep", &mut io::stdout());
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays reserved for reports and JSON-RPC.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run_search(
    tool: SearchTool,
    params: SearchToolParams,
    format: OutputFormat,
    compact: bool,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let request = tool.request(&params, cancel.clone());
    tracing::debug!(description = %tool.description(&params), "starting search");

    let tool = Arc::new(tool);
    let worker = {
        let tool = Arc::clone(&tool);
        let request = request.clone();
        tokio::task::spawn_blocking(move || tool.searcher().search(&request))
    };
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let searched = worker.await.context("Search task failed")?;
    interrupt.abort();

    let outcome = match searched {
        Ok(outcome) => outcome,
        Err(err) => {
            let hint = match &err {
                SearchError::OutOfWorkspace { path, .. } => Some(
                    suggestions::workspace_root_suggestion(&path.display().to_string()),
                ),
                _ => None,
            };
            let result = tool_result(&request, Err(err));
            eprintln!("{} {}", "✗".red(), result.llm_content);
            if let Some(hint) = hint {
                eprintln!("\n{}", hint);
            }
            std::process::exit(1);
        }
    };

    match format {
        OutputFormat::Json => print_json(&SearchReport::new(&request, &outcome), compact)?,
        OutputFormat::Text => {
            let result = tool_result(&request, Ok(outcome));
            println!("{}", result.llm_content);
            eprintln!("{} {}", "✓".green(), result.return_display);
        }
    }

    Ok(())
}
