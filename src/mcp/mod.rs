// SPDX-License-Identifier: MIT OR Apache-2.0

//! MCP server support for spangrep (stdio JSON-RPC).
//!
//! Tool calls run on blocking tasks so that `notifications/cancelled` can
//! reach a search while it is still walking the workspace.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use spangrep::tool::{SearchTool, SearchToolParams, ToolResult, TOOL_NAME};

const PROTOCOL_VERSION: &str = "2024-11-05";

const HARNESS_INSTRUCTIONS: &str = "\
spangrep MCP harness (ranked chunk search only).\n\
\n\
spangrep_search splits every workspace file into overlapping line chunks,\n\
ranks them against the query with BM25 and returns the 10 best chunks with\n\
file, line range and score.\n\
\n\
Harness rules:\n\
- Use keywords that are likely to appear in the code or docs you want.\n\
- Narrow `path` and `include` early to cut noise.\n\
- Smaller `chunk_size` gives tighter spans; larger gives more context.\n\
\n\
This server is read/search oriented; it does not mutate files.";

/// A running `tools/call`, keyed by its JSON-RPC id
struct InFlightCall {
    /// Distinguishes calls that reuse an id
    generation: u64,
    cancel: CancellationToken,
}

type InFlight = Arc<Mutex<HashMap<String, InFlightCall>>>;

pub async fn run(tool: SearchTool) -> io::Result<()> {
    let tool = Arc::new(tool);
    let in_flight: InFlight = Arc::default();
    let mut generation = 0u64;
    let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(resp) = rx.recv().await {
            let mut line = serde_json::to_vec(&resp)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
            stdout.flush().await?;
        }
        Ok::<(), io::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req = match serde_json::from_str::<JsonRpcRequest>(&line) {
            Ok(req) => req,
            Err(err) => {
                let _ = tx.send(error_response(None, -32700, format!("parse error: {}", err)));
                continue;
            }
        };

        if req.method == "notifications/cancelled" {
            cancel_in_flight(&in_flight, &req.params);
            continue;
        }

        // JSON-RPC notifications have no id; no response needed.
        let Some(id) = req.id.clone() else {
            continue;
        };

        if req.method == "tools/call" {
            generation += 1;
            spawn_tool_call(&tool, &in_flight, &tx, generation, id, req.params);
        } else {
            let _ = tx.send(handle_request(&req, id));
        }
    }

    // Running calls hold their own senders, so the writer drains their
    // answers before it stops.
    drop(tx);
    writer.await.map_err(io::Error::other)?
}

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    _jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

fn success_response(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id: Some(id),
        result: Some(result),
        error: None,
    }
}

fn error_response(id: Option<Value>, code: i32, message: String) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError { code, message }),
    }
}

fn handle_request(req: &JsonRpcRequest, id: Value) -> JsonRpcResponse {
    match req.method.as_str() {
        "initialize" => success_response(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "spangrep",
                    "version": env!("CARGO_PKG_VERSION")
                },
                "instructions": HARNESS_INSTRUCTIONS
            }),
        ),
        "ping" => success_response(id, json!({})),
        "tools/list" => success_response(
            id,
            json!({
                "tools": [SearchTool::definition()]
            }),
        ),
        _ => error_response(
            Some(id),
            -32601,
            format!("method not found: {}", req.method),
        ),
    }
}

fn lock(in_flight: &InFlight) -> std::sync::MutexGuard<'_, HashMap<String, InFlightCall>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

fn request_key(id: &Value) -> String {
    id.to_string()
}

fn cancel_in_flight(in_flight: &InFlight, params: &Value) {
    let Some(request_id) = params.get("requestId") else {
        return;
    };
    if let Some(call) = lock(in_flight).get(&request_key(request_id)) {
        tracing::debug!(request_id = %request_id, "cancelling tool call");
        call.cancel.cancel();
    }
}

fn spawn_tool_call(
    tool: &Arc<SearchTool>,
    in_flight: &InFlight,
    tx: &mpsc::UnboundedSender<JsonRpcResponse>,
    generation: u64,
    id: Value,
    params: Value,
) {
    let key = request_key(&id);
    let cancel = CancellationToken::new();
    lock(in_flight).insert(
        key.clone(),
        InFlightCall {
            generation,
            cancel: cancel.clone(),
        },
    );

    let tool = Arc::clone(tool);
    let in_flight = Arc::clone(in_flight);
    let tx = tx.clone();
    tokio::spawn(async move {
        let task_cancel = cancel.clone();
        let joined =
            tokio::task::spawn_blocking(move || dispatch_tool(&tool, &params, task_cancel)).await;
        finish_call(&in_flight, &key, generation);

        // Only `notifications/cancelled` trips this token; such calls get no response.
        if cancel.is_cancelled() {
            return;
        }

        let resp = match joined {
            Ok(Ok(result)) => success_response(id, tool_call_result(&result)),
            Ok(Err(message)) => success_response(
                id,
                json!({
                    "content": [{
                        "type": "text",
                        "text": message
                    }],
                    "isError": true
                }),
            ),
            Err(err) => error_response(Some(id), -32603, format!("tool call failed: {}", err)),
        };
        let _ = tx.send(resp);
    });
}

/// Forget a finished call unless a newer call has taken over its id.
fn finish_call(in_flight: &InFlight, key: &str, generation: u64) {
    let mut calls = lock(in_flight);
    if calls.get(key).is_some_and(|call| call.generation == generation) {
        calls.remove(key);
    }
}

fn dispatch_tool(
    tool: &SearchTool,
    params: &Value,
    cancel: CancellationToken,
) -> Result<ToolResult, String> {
    let tool_name = params
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if tool_name != TOOL_NAME {
        return Err(format!("unknown tool: {}", tool_name));
    }

    let args = params.get("arguments").cloned().unwrap_or(Value::Null);
    let args: SearchToolParams = serde_json::from_value(args)
        .map_err(|e| format!("Error: Invalid parameters provided. Reason: {}", e))?;
    if let Some(reason) = tool.validate(&args) {
        return Err(format!("Error: Invalid parameters provided. Reason: {}", reason));
    }

    tracing::debug!(description = %tool.description(&args), "tool call");
    Ok(tool.execute(&args, cancel))
}

fn tool_call_result(result: &ToolResult) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": result.llm_content
        }],
        "isError": result.is_error,
        "_meta": {
            "display": result.return_display
        }
    })
}
