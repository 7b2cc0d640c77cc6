// SPDX-License-Identifier: MIT OR Apache-2.0

//! spangrep - BM25 ranked chunk search library
//!
//! Walks a workspace, cuts every file into overlapping line windows and
//! ranks the windows against a free-text query. Nothing is persisted between
//! requests.

pub mod chunker;
pub mod config;
pub mod errors;
pub mod output;
pub mod ranking;
pub mod scanner;
pub mod search;
pub mod tool;
pub mod workspace;
