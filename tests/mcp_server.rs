// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::{json, Value};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use tempfile::TempDir;

fn write_file(path: &std::path::Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, content).expect("write file");
}

struct McpProc {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl McpProc {
    fn spawn(cwd: &std::path::Path) -> Self {
        let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin!("spangrep"))
            .current_dir(cwd)
            .env("HOME", cwd.join(".no-home"))
            .args(["mcp", "serve"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .expect("spawn mcp");
        let stdin = child.stdin.take().expect("stdin");
        let stdout = BufReader::new(child.stdout.take().expect("stdout"));
        Self {
            child,
            stdin: Some(stdin),
            stdout,
        }
    }

    fn send_raw(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("stdin open");
        writeln!(stdin, "{}", line).expect("write req");
        stdin.flush().expect("flush");
    }

    fn send(&mut self, msg: Value) {
        let line = serde_json::to_string(&msg).expect("encode");
        self.send_raw(&line);
    }

    /// Next response line, or `None` once the server closed stdout.
    fn read(&mut self) -> Option<Value> {
        let mut resp_line = String::new();
        let read = self.stdout.read_line(&mut resp_line).expect("read resp");
        (read > 0).then(|| serde_json::from_str(&resp_line).expect("parse resp"))
    }

    fn call(&mut self, req: Value) -> Value {
        self.send(req);
        self.read().expect("response")
    }

    fn close_stdin(&mut self) {
        self.stdin.take();
    }

    fn stop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn search_call(id: u64, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {
            "name": "spangrep_search",
            "arguments": arguments
        }
    })
}

#[test]
fn mcp_initialize_and_list_tools() {
    let dir = TempDir::new().expect("tempdir");
    let mut mcp = McpProc::spawn(dir.path());

    let init = mcp.call(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {}
    }));
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(init["result"]["serverInfo"]["name"], "spangrep");
    assert!(init["result"]["instructions"]
        .as_str()
        .unwrap_or_default()
        .contains("harness"));

    // Notifications get no reply; the next line must answer the ping.
    mcp.send(json!({
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }));
    let ping = mcp.call(json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "ping"
    }));
    assert_eq!(ping["id"], 2);
    assert!(ping["result"].is_object());

    let tools = mcp.call(json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "tools/list",
        "params": {}
    }));
    let names: Vec<String> = tools["result"]["tools"]
        .as_array()
        .expect("tools array")
        .iter()
        .filter_map(|tool| tool["name"].as_str().map(str::to_string))
        .collect();
    assert_eq!(names, vec!["spangrep_search".to_string()]);

    mcp.stop();
}

#[test]
fn mcp_search_returns_ranked_chunks() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("fileA.txt"), "the quick brown fox");
    write_file(&dir.path().join("fileB.js"), "function fox() {}");
    let mut mcp = McpProc::spawn(dir.path());

    let resp = mcp.call(search_call(10, json!({ "query": "fox", "include": "*.js" })));
    assert_eq!(resp["id"], 10);
    assert_eq!(resp["result"]["isError"], false);
    let text = resp["result"]["content"][0]["text"]
        .as_str()
        .expect("text content");
    assert!(text.starts_with("Found 1 match for query \"fox\" (filter: \"*.js\"):"));
    assert!(text.contains("File: fileB.js"));
    assert_eq!(resp["result"]["_meta"]["display"], "Found 1 match");

    mcp.stop();
}

#[test]
fn mcp_search_reports_errors_in_content() {
    let dir = TempDir::new().expect("tempdir");
    let mut mcp = McpProc::spawn(dir.path());

    let escape = mcp.call(search_call(20, json!({ "query": "fox", "path": "../.." })));
    assert_eq!(escape["result"]["isError"], true);
    assert!(escape["result"]["content"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Error: Path validation failed"));

    let invalid = mcp.call(search_call(21, json!({ "query": "" })));
    assert_eq!(invalid["result"]["isError"], true);
    assert!(invalid["result"]["content"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Error: Invalid parameters provided."));

    mcp.stop();
}

#[test]
fn mcp_unknown_method_and_bad_json() {
    let dir = TempDir::new().expect("tempdir");
    let mut mcp = McpProc::spawn(dir.path());

    let unknown = mcp.call(json!({
        "jsonrpc": "2.0",
        "id": 30,
        "method": "resources/list"
    }));
    assert_eq!(unknown["error"]["code"], -32601);

    mcp.send_raw("{not json");
    let parsed = mcp.read().expect("response");
    assert_eq!(parsed["error"]["code"], -32700);
    assert!(parsed["id"].is_null());

    mcp.stop();
}

#[test]
fn mcp_answers_pending_calls_after_stdin_closes() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("fileA.txt"), "the quick brown fox");
    let mut mcp = McpProc::spawn(dir.path());

    mcp.send(json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }));
    mcp.send(search_call(2, json!({ "query": "fox" })));
    mcp.close_stdin();

    let mut ids = Vec::new();
    while let Some(resp) = mcp.read() {
        if resp["id"] == 2 {
            assert_eq!(resp["result"]["isError"], false);
            assert!(resp["result"]["content"][0]["text"]
                .as_str()
                .unwrap_or_default()
                .contains("File: fileA.txt"));
        }
        ids.push(resp["id"].clone());
    }
    assert!(ids.contains(&json!(1)));
    assert!(ids.contains(&json!(2)));

    let status = mcp.child.wait().expect("wait");
    assert!(status.success());
}

#[test]
fn mcp_cancelled_call_gets_no_response() {
    let dir = TempDir::new().expect("tempdir");
    // Enough files that the walk is still running when the cancel arrives.
    for i in 0..3000 {
        write_file(
            &dir.path().join(format!("d{}/f{}.txt", i % 30, i)),
            "fox and more fox\nanother line\n",
        );
    }
    let mut mcp = McpProc::spawn(dir.path());

    mcp.send(search_call(5, json!({ "query": "fox" })));
    mcp.send(json!({
        "jsonrpc": "2.0",
        "method": "notifications/cancelled",
        "params": { "requestId": 5, "reason": "user" }
    }));
    let ping = mcp.call(json!({ "jsonrpc": "2.0", "id": 6, "method": "ping" }));
    assert_eq!(ping["id"], 6);

    mcp.close_stdin();
    while let Some(resp) = mcp.read() {
        assert_ne!(resp["id"], 5, "cancelled call was answered: {}", resp);
    }
    mcp.stop();
}
