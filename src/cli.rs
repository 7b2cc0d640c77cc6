// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// spangrep - ranked chunk search for AI agents
///
/// Splits every file under the workspace into overlapping line chunks and
/// ranks them against a free-text query with BM25. No index is kept.
#[derive(Parser, Debug)]
#[command(name = "spangrep")]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = "Search quickstart:\n  spangrep s \"token refresh\" src/\n  spangrep search -i '**/*.rs' -c 40 -o 10 \"retry backoff\""
)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Compact JSON output (no pretty formatting)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Workspace root directory (repeatable; defaults to config or current directory)
    #[arg(long = "root", global = true, value_name = "DIR")]
    pub roots: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Run spangrep as an MCP stdio server
    #[command(visible_aliases = ["run"])]
    Serve,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank file chunks against a query with BM25
    #[command(
        visible_aliases = ["s", "find", "q"],
        after_help = "Examples:\n  spangrep s \"token refresh\" src/\n  spangrep search \"auth flow\" -p services -i '**/*.go'"
    )]
    Search {
        /// Search query (natural language or keywords)
        query: String,

        /// Optional path (grep-style positional form)
        #[arg(value_name = "PATH", conflicts_with = "path")]
        path_positional: Option<String>,

        /// Directory to search, relative to the first workspace root
        #[arg(short, long)]
        path: Option<String>,

        /// Only search files matching this glob (relative to the search directory)
        #[arg(short = 'i', long, visible_alias = "glob")]
        include: Option<String>,

        /// Lines per chunk (default: 100)
        #[arg(short = 'c', long)]
        chunk_size: Option<usize>,

        /// Lines shared by consecutive chunks (default: 20)
        #[arg(short = 'o', long)]
        overlap: Option<usize>,
    },

    /// MCP server commands
    Mcp {
        #[command(subcommand)]
        command: McpCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
